//! Scenario files: an element fixture for an in-memory page plus the wire
//! messages to dispatch against it, in order.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use action_automations::{AutomationOutcome, MemoryPage, PageElement, PagePorts};
use anyhow::{Context, Result};
use automation_registry::{AutomationDispatcher, AutomationRegistry, BrowsingContext, Execution};
use autopilot_core_types::{AutomationError, ExecCtx, Point};
use autopilot_event_bus::AutomationEvent;
use command_protocol::CommandMessage;
use cursor_controller::{CursorUi, NullOverlay};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EngineConfig;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Default for Size {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub viewport: Size,
    /// Scrollable document size; defaults to the viewport.
    #[serde(default)]
    pub document: Option<Size>,
    /// Element focused before the first command.
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default)]
    pub elements: Vec<PageElement>,
    pub commands: Vec<CommandMessage>,
}

impl Scenario {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing scenario {}", path.display()))
    }

    fn build_page(&self) -> MemoryPage {
        let page =
            MemoryPage::with_elements(self.viewport.width, self.viewport.height, self.elements.clone());
        if let Some(document) = self.document {
            page.set_document_size(document.width, document.height);
        }
        if let Some(id) = &self.focus {
            page.focus(id);
        }
        page
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub kind: String,
    pub message: String,
    pub hint: String,
}

impl From<&AutomationError> for ErrorReport {
    fn from(err: &AutomationError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            hint: err.user_message(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandReport {
    pub index: usize,
    pub command: String,
    /// Last state reached; absent when no instance was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<AutomationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
    pub events: Vec<AutomationEvent>,
}

impl CommandReport {
    fn new(index: usize, command: &CommandMessage, execution: Execution) -> Self {
        let (outcome, error) = match &execution.result {
            Ok(outcome) => (Some(outcome.clone()), None),
            Err(err) => (None, Some(ErrorReport::from(err))),
        };
        Self {
            index,
            command: command.type_id.clone(),
            state: execution.final_state.map(|state| state.to_string()),
            outcome,
            error,
            events: execution.events,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    pub commands: Vec<CommandReport>,
    pub cursor: Point,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focused: Option<String>,
    /// Final values of the fixture elements that carry one.
    pub values: BTreeMap<String, String>,
}

impl ScenarioReport {
    pub fn rejected(&self) -> usize {
        self.commands.iter().filter(|report| !report.succeeded()).count()
    }
}

/// Dispatches every command of `scenario` in order against a fresh page.
/// A rejected command is reported and does not stop the run.
pub async fn run_scenario(
    scenario: &Scenario,
    config: &EngineConfig,
    strict: Option<bool>,
) -> ScenarioReport {
    let page = Arc::new(scenario.build_page());
    let context = BrowsingContext::new(
        PagePorts::from_page(page.clone()),
        &config.cursor_config(),
        Arc::new(NullOverlay),
        config.policy(),
    );
    let dispatcher = AutomationDispatcher::new(Arc::new(AutomationRegistry::with_default_handlers()));
    info!(
        scenario = scenario.name.as_deref().unwrap_or("unnamed"),
        commands = scenario.commands.len(),
        context = %context.id().0,
        "running scenario"
    );

    let mut reports = Vec::with_capacity(scenario.commands.len());
    for (index, message) in scenario.commands.iter().enumerate() {
        let exec = ExecCtx::with_timeout(context.id().clone(), config.automation.command_timeout);
        let execution = dispatcher.execute(&context, message, &exec, strict).await;
        if let Err(err) = &execution.result {
            warn!(index, command = %message.type_id, kind = %err.kind(), "scenario command rejected");
        }
        reports.push(CommandReport::new(index, message, execution));
    }

    let values = scenario
        .elements
        .iter()
        .filter_map(|element| {
            let value = page.value(&element.id)?;
            (!value.is_empty() || !element.value.is_empty()).then(|| (element.id.clone(), value))
        })
        .collect();
    ScenarioReport {
        scenario: scenario.name.clone(),
        commands: reports,
        cursor: context.cursor().position().await,
        focused: page.focused().map(|element| element.as_str().to_string()),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headless_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.cursor.render = false;
        config.automation.step_delay = std::time::Duration::ZERO;
        config.automation.typing_delay = std::time::Duration::ZERO;
        config
    }

    fn login_form() -> Scenario {
        serde_json::from_value(json!({
            "name": "login",
            "elements": [
                { "id": "email", "tag": "input", "editable": true,
                  "bounds": { "x": 100.0, "y": 100.0, "width": 200.0, "height": 20.0 } },
                { "id": "submit", "tag": "button",
                  "bounds": { "x": 100.0, "y": 160.0, "width": 80.0, "height": 30.0 } }
            ],
            "commands": [
                { "type": "type-text", "target": { "by": "selector", "value": "#email" }, "text": "me@example.com" },
                { "type": "click", "target": { "by": "selector", "value": "button#submit" } },
                { "type": "navigate-to", "url": "https://example.com" }
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn commands_run_in_order_and_failures_are_reported() {
        let report = run_scenario(&login_form(), &headless_config(), None).await;

        assert_eq!(report.commands.len(), 3);
        assert!(report.commands[0].succeeded());
        assert!(report.commands[1].succeeded());
        let failed = &report.commands[2];
        assert_eq!(failed.error.as_ref().unwrap().kind, "ActionExecutionError");
        assert!(failed.state.as_deref().unwrap().starts_with("rejected"));
        assert_eq!(report.rejected(), 1);

        assert_eq!(report.values.get("email").map(String::as_str), Some("me@example.com"));
        assert_eq!(report.cursor, Point::new(140.0, 175.0));
    }

    #[tokio::test]
    async fn report_serializes_events_and_outcomes() {
        let report = run_scenario(&login_form(), &headless_config(), Some(false)).await;
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["commands"][1]["state"], "resolved");
        assert_eq!(json["commands"][1]["events"][0]["event"], "TARGET_ELEMENT_FOUND");
        assert_eq!(json["commands"][0]["outcome"]["kind"], "done");
    }
}
