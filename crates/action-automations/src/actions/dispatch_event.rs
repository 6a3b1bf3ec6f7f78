use async_trait::async_trait;
use autopilot_core_types::AutomationError;
use command_protocol::ActionOptions;

use super::{ActionSteps, Readiness, Targets};
use crate::dispatch::StepDispatcher;
use crate::model::AutomationOutcome;
use crate::ports::{EventOptions, InputEventType};

/// A single named event, sent without moving the cursor.
pub(crate) struct DispatchEvent {
    options: ActionOptions,
}

impl DispatchEvent {
    pub(crate) fn new(options: ActionOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl ActionSteps for DispatchEvent {
    fn readiness(&self) -> Readiness {
        Readiness::Attached
    }

    async fn perform(
        &self,
        steps: &StepDispatcher<'_>,
        targets: Targets,
    ) -> Result<AutomationOutcome, AutomationError> {
        let name = self
            .options
            .event_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AutomationError::command_validation("eventName", "must not be empty"))?;
        steps
            .emit(
                InputEventType::Custom(name.to_string()),
                &targets.primary.element,
                EventOptions {
                    detail: self.options.event_init.clone(),
                    ..EventOptions::default()
                },
            )
            .await?;
        Ok(AutomationOutcome::Done)
    }
}
