use std::fmt;
use std::sync::Arc;

use action_automations::{Automation, AutomationDeps, ElementSnapshot};
use autopilot_core_types::AutomationError;
use command_protocol::ActionCommand;

pub type CreateFn = Arc<
    dyn Fn(&ActionCommand, &[ElementSnapshot], AutomationDeps) -> Result<Box<dyn Automation>, AutomationError>
        + Send
        + Sync,
>;
pub type CommandCheck = Arc<dyn Fn(&ActionCommand) -> Result<(), AutomationError> + Send + Sync>;
pub type ElementCheck =
    Arc<dyn Fn(&ActionCommand, &[ElementSnapshot]) -> Result<(), AutomationError> + Send + Sync>;

fn accept_command(_: &ActionCommand) -> Result<(), AutomationError> {
    Ok(())
}

fn accept_elements(_: &ActionCommand, _: &[ElementSnapshot]) -> Result<(), AutomationError> {
    Ok(())
}

/// Registry entry. Every hook is always present; hooks a command does not
/// need are no-ops.
#[derive(Clone)]
pub struct AutomationHandler {
    create: CreateFn,
    ensure_cmd_args: CommandCheck,
    ensure_els_props: ElementCheck,
    additional_selector_props: Vec<String>,
}

impl AutomationHandler {
    pub fn new<F>(create: F) -> Self
    where
        F: Fn(&ActionCommand, &[ElementSnapshot], AutomationDeps) -> Result<Box<dyn Automation>, AutomationError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            create: Arc::new(create),
            ensure_cmd_args: Arc::new(accept_command),
            ensure_els_props: Arc::new(accept_elements),
            additional_selector_props: Vec::new(),
        }
    }

    pub fn with_command_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&ActionCommand) -> Result<(), AutomationError> + Send + Sync + 'static,
    {
        self.ensure_cmd_args = Arc::new(check);
        self
    }

    pub fn with_element_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&ActionCommand, &[ElementSnapshot]) -> Result<(), AutomationError>
            + Send
            + Sync
            + 'static,
    {
        self.ensure_els_props = Arc::new(check);
        self
    }

    pub fn with_selector_props<I, S>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.additional_selector_props = props.into_iter().map(Into::into).collect();
        self
    }

    pub fn create(
        &self,
        command: &ActionCommand,
        elements: &[ElementSnapshot],
        deps: AutomationDeps,
    ) -> Result<Box<dyn Automation>, AutomationError> {
        (self.create)(command, elements, deps)
    }

    pub fn ensure_cmd_args(&self, command: &ActionCommand) -> Result<(), AutomationError> {
        (self.ensure_cmd_args)(command)
    }

    pub fn ensure_els_props(
        &self,
        command: &ActionCommand,
        elements: &[ElementSnapshot],
    ) -> Result<(), AutomationError> {
        (self.ensure_els_props)(command, elements)
    }

    pub fn additional_selector_props(&self) -> &[String] {
        &self.additional_selector_props
    }
}

impl fmt::Debug for AutomationHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutomationHandler")
            .field("additional_selector_props", &self.additional_selector_props)
            .finish_non_exhaustive()
    }
}
