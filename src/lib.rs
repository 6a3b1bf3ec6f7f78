//! Autopilot scenario runner.
//!
//! Wires the automation engine crates into a process: layered configuration,
//! tracing setup and scenario files executed against an in-memory page.

pub mod config;
pub mod logging;
pub mod scenario;

use command_protocol::CommandType;
use serde::Serialize;

pub use config::EngineConfig;
pub use logging::init_logging;
pub use scenario::{run_scenario, CommandReport, ErrorReport, Scenario, ScenarioReport};

/// One row of the protocol table as printed by `autopilot commands`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolEntry {
    pub name: &'static str,
    pub wire_id: &'static str,
    pub automation: bool,
}

pub fn protocol_entries(automation_only: bool) -> Vec<ProtocolEntry> {
    CommandType::ALL
        .iter()
        .filter(|kind| !automation_only || kind.is_automation())
        .map(|kind| ProtocolEntry {
            name: kind.name(),
            wire_id: kind.wire_id(),
            automation: kind.is_automation(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn automation_listing_keeps_table_order() {
        let all = protocol_entries(false);
        let automations = protocol_entries(true);
        assert_eq!(all.len(), CommandType::ALL.len());
        assert_eq!(automations.len(), 15);
        assert_eq!(automations[0].wire_id, "dispatch-event");
        assert!(all.iter().any(|entry| entry.wire_id == "set-files-to-upload" && !entry.automation));
    }
}
