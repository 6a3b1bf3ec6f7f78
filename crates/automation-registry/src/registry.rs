use std::sync::Arc;

use action_automations::{build, selector_properties};
use autopilot_core_types::AutomationError;
use command_protocol::CommandType;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::checks::{command_checks, element_checks};
use crate::handler::AutomationHandler;

/// Binds command identifiers to handlers. Filled at start-up, read-only
/// afterwards in practice.
#[derive(Default)]
pub struct AutomationRegistry {
    handlers: DashMap<CommandType, Arc<AutomationHandler>>,
}

impl AutomationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a handler for every protocol command type. Types outside
    /// the automation subset get instances that reject when run.
    pub fn with_default_handlers() -> Self {
        let registry = Self::new();
        for kind in CommandType::ALL.iter().copied() {
            if let Err(err) = registry.register(kind, default_handler(kind)) {
                warn!(command = %kind, %err, "default handler not registered");
            }
        }
        info!(
            handlers = registry.len(),
            automations = CommandType::automations().count(),
            "default handlers registered"
        );
        registry
    }

    pub fn register(
        &self,
        kind: CommandType,
        handler: AutomationHandler,
    ) -> Result<(), AutomationError> {
        match self.handlers.entry(kind) {
            Entry::Occupied(_) => Err(AutomationError::DuplicateHandler(kind.wire_id().to_string())),
            Entry::Vacant(slot) => {
                debug!(command = %kind, "handler registered");
                slot.insert(Arc::new(handler));
                Ok(())
            }
        }
    }

    /// Looks up the handler for a wire identifier. Identifiers missing from
    /// the protocol table and identifiers without a handler both fail.
    pub fn resolve(&self, wire_id: &str) -> Result<Arc<AutomationHandler>, AutomationError> {
        let kind = CommandType::from_wire_id(wire_id)
            .ok_or_else(|| AutomationError::UnknownCommand(wire_id.to_string()))?;
        self.resolve_type(kind)
    }

    pub fn resolve_type(&self, kind: CommandType) -> Result<Arc<AutomationHandler>, AutomationError> {
        self.handlers
            .get(&kind)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| AutomationError::UnknownCommand(kind.wire_id().to_string()))
    }

    pub fn contains(&self, kind: CommandType) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered command types in table order.
    pub fn command_types(&self) -> Vec<CommandType> {
        let mut kinds: Vec<CommandType> = self.handlers.iter().map(|entry| *entry.key()).collect();
        kinds.sort();
        kinds
    }
}

/// Handler wired to the built-in automation for `kind`.
pub fn default_handler(kind: CommandType) -> AutomationHandler {
    let checks = command_checks(kind);
    AutomationHandler::new(|command, _elements, deps| build(command, deps))
        .with_command_check(move |command| checks.iter().try_for_each(|check| check(command)))
        .with_element_check(move |_command, elements| element_checks(kind, elements))
        .with_selector_props(selector_properties(kind).iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = AutomationRegistry::with_default_handlers();
        let err = registry
            .register(CommandType::Click, default_handler(CommandType::Click))
            .unwrap_err();
        assert!(matches!(err, AutomationError::DuplicateHandler(id) if id == "click"));
    }

    #[test]
    fn unknown_and_unregistered_identifiers_fail() {
        let registry = AutomationRegistry::with_default_handlers();
        assert!(matches!(
            registry.resolve("foo-bar"),
            Err(AutomationError::UnknownCommand(id)) if id == "foo-bar"
        ));
        assert!(matches!(
            AutomationRegistry::new().resolve("type-text"),
            Err(AutomationError::UnknownCommand(id)) if id == "type-text"
        ));
        assert!(registry.resolve("type-text").is_ok());
    }

    #[test]
    fn default_handlers_cover_the_whole_table() {
        let registry = AutomationRegistry::with_default_handlers();
        assert_eq!(registry.len(), CommandType::ALL.len());
        assert_eq!(registry.command_types(), CommandType::ALL.to_vec());
        assert!(registry.resolve("navigate-to").is_ok());
        let props = registry.resolve("type-text").unwrap();
        assert_eq!(props.additional_selector_props(), ["value", "isContentEditable"]);
    }
}
