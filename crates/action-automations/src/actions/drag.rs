use async_trait::async_trait;
use autopilot_core_types::{AutomationError, Point};
use command_protocol::ActionOptions;
use cursor_controller::MouseButton;
use tracing::debug;

use super::{ActionSteps, Targets};
use crate::dispatch::{action_point, StepDispatcher};
use crate::model::AutomationOutcome;

enum DragEnd {
    /// Relative to the grab point.
    Offset,
    Element,
}

pub(crate) struct Drag {
    end: DragEnd,
    options: ActionOptions,
}

impl Drag {
    pub(crate) fn by_offset(options: ActionOptions) -> Self {
        Self {
            end: DragEnd::Offset,
            options,
        }
    }

    pub(crate) fn to_element(options: ActionOptions) -> Self {
        Self {
            end: DragEnd::Element,
            options,
        }
    }
}

#[async_trait]
impl ActionSteps for Drag {
    fn uses_destination(&self) -> bool {
        matches!(self.end, DragEnd::Element)
    }

    async fn perform(
        &self,
        steps: &StepDispatcher<'_>,
        targets: Targets,
    ) -> Result<AutomationOutcome, AutomationError> {
        let options = &self.options;
        let grab = steps
            .aim(&targets.primary, options.offset_x, options.offset_y)
            .await?;
        steps.press(MouseButton::Left, &grab.target, grab.point, 1).await?;
        steps.step_pause().await?;

        let (drop_point, fallback) = match (&self.end, &targets.secondary) {
            (DragEnd::Element, Some(destination)) => {
                let current = steps.refresh(&destination.element).await?;
                let point = action_point(
                    &current.bounds,
                    options.destination_offset_x,
                    options.destination_offset_y,
                );
                (point, current.element)
            }
            (DragEnd::Element, None) => {
                return Err(AutomationError::execution("drag destination was not resolved"))
            }
            (DragEnd::Offset, _) => (
                grab.point.offset(
                    options.drag_offset_x.unwrap_or(0.0),
                    options.drag_offset_y.unwrap_or(0.0),
                ),
                grab.target.clone(),
            ),
        };
        debug!(from = %grab.point, to = %drop_point, "dragging");

        let under = steps.drag_to(drop_point, &fallback).await?;
        steps.step_pause().await?;
        steps.release(MouseButton::Left, &under, drop_point, 1).await?;

        let position: Point = steps.cursor_position().await;
        Ok(AutomationOutcome::CursorPosition(position))
    }
}
