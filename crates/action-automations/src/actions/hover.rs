use async_trait::async_trait;
use autopilot_core_types::AutomationError;
use command_protocol::ActionOptions;

use super::{ActionSteps, Targets};
use crate::dispatch::StepDispatcher;
use crate::model::AutomationOutcome;
use crate::ports::InputEventType;

pub(crate) struct Hover {
    options: ActionOptions,
}

impl Hover {
    pub(crate) fn new(options: ActionOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl ActionSteps for Hover {
    async fn perform(
        &self,
        steps: &StepDispatcher<'_>,
        targets: Targets,
    ) -> Result<AutomationOutcome, AutomationError> {
        let aim = steps
            .aim(&targets.primary, self.options.offset_x, self.options.offset_y)
            .await?;
        steps
            .emit(
                InputEventType::MouseOver,
                &aim.target,
                steps.pointer(aim.point, None, 0),
            )
            .await?;
        Ok(AutomationOutcome::Done)
    }
}
