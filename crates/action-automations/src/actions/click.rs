use async_trait::async_trait;
use autopilot_core_types::AutomationError;
use command_protocol::ActionOptions;
use cursor_controller::MouseButton;

use super::{ActionSteps, Targets};
use crate::dispatch::StepDispatcher;
use crate::model::AutomationOutcome;
use crate::ports::InputEventType;

pub(crate) struct Click {
    button: MouseButton,
    double: bool,
    options: ActionOptions,
}

impl Click {
    pub(crate) fn left(options: ActionOptions) -> Self {
        Self {
            button: MouseButton::Left,
            double: false,
            options,
        }
    }

    pub(crate) fn right(options: ActionOptions) -> Self {
        Self {
            button: MouseButton::Right,
            double: false,
            options,
        }
    }

    pub(crate) fn double(options: ActionOptions) -> Self {
        Self {
            button: MouseButton::Left,
            double: true,
            options,
        }
    }
}

#[async_trait]
impl ActionSteps for Click {
    async fn perform(
        &self,
        steps: &StepDispatcher<'_>,
        targets: Targets,
    ) -> Result<AutomationOutcome, AutomationError> {
        let aim = steps
            .aim(&targets.primary, self.options.offset_x, self.options.offset_y)
            .await?;
        steps.click_at(&aim, self.button, 1).await?;
        if self.double {
            steps.step_pause().await?;
            steps.click_at(&aim, self.button, 2).await?;
            steps
                .emit(
                    InputEventType::DblClick,
                    &aim.target,
                    steps.pointer(aim.point, Some(self.button), 2),
                )
                .await?;
        }
        Ok(AutomationOutcome::Done)
    }
}
