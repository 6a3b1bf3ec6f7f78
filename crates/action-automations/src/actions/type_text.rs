use async_trait::async_trait;
use autopilot_core_types::AutomationError;
use autopilot_event_bus::AutomationWarning;
use command_protocol::ActionOptions;
use cursor_controller::MouseButton;
use tracing::debug;

use super::{ActionSteps, Targets};
use crate::dispatch::StepDispatcher;
use crate::model::AutomationOutcome;
use crate::ports::{EventOptions, InputEventType, SelectionRange};

pub(crate) struct TypeText {
    options: ActionOptions,
}

impl TypeText {
    pub(crate) fn new(options: ActionOptions) -> Self {
        Self { options }
    }

    fn text(&self) -> Result<&str, AutomationError> {
        self.options
            .text
            .as_deref()
            .filter(|text| !text.is_empty())
            .ok_or_else(|| AutomationError::command_validation("text", "must not be empty"))
    }

    /// Text as it may appear in logs.
    fn loggable(&self, text: &str) -> String {
        if self.options.confidential {
            format!("<{} chars>", text.chars().count())
        } else {
            text.to_string()
        }
    }
}

#[async_trait]
impl ActionSteps for TypeText {
    async fn perform(
        &self,
        steps: &StepDispatcher<'_>,
        targets: Targets,
    ) -> Result<AutomationOutcome, AutomationError> {
        let text = self.text()?;
        let aim = steps
            .aim(&targets.primary, self.options.offset_x, self.options.offset_y)
            .await?;
        steps.click_at(&aim, MouseButton::Left, 1).await?;

        let element = aim.snapshot.element.clone();
        let focused = steps.ports().dom.focused_element().await?;
        if focused.as_ref() != Some(&element) {
            steps.warn(AutomationWarning::FocusChanged {
                expected: element.clone(),
                actual: focused,
            });
        }

        if let Some(caret) = self.options.caret_pos {
            steps
                .emit(
                    InputEventType::Select,
                    &element,
                    EventOptions {
                        selection: Some(SelectionRange::within(element.clone(), caret, caret)),
                        ..EventOptions::default()
                    },
                )
                .await?;
        }
        if self.options.replace {
            steps
                .emit(
                    InputEventType::Input,
                    &element,
                    EventOptions {
                        text: Some(String::new()),
                        replace: true,
                        ..EventOptions::default()
                    },
                )
                .await?;
        }

        debug!(%element, text = %self.loggable(text), paste = self.options.paste, "typing");
        if self.options.paste {
            steps
                .emit(
                    InputEventType::Input,
                    &element,
                    EventOptions {
                        text: Some(text.to_string()),
                        ..EventOptions::default()
                    },
                )
                .await?;
            return Ok(AutomationOutcome::Done);
        }

        for (index, ch) in text.chars().enumerate() {
            if index > 0 {
                steps.typing_pause().await?;
            }
            let key = ch.to_string();
            let keyed = EventOptions {
                key: Some(key.clone()),
                ..EventOptions::default()
            };
            steps
                .emit(InputEventType::KeyDown, &element, keyed.clone())
                .await?;
            steps
                .emit(InputEventType::KeyPress, &element, keyed.clone())
                .await?;
            steps
                .emit(
                    InputEventType::Input,
                    &element,
                    EventOptions {
                        text: Some(key),
                        ..EventOptions::default()
                    },
                )
                .await?;
            steps.emit(InputEventType::KeyUp, &element, keyed).await?;
        }
        Ok(AutomationOutcome::Done)
    }
}
