use async_trait::async_trait;
use autopilot_core_types::{AutomationError, ElementRef};
use command_protocol::{ActionOptions, ElementTarget};

use super::{ActionSteps, Readiness, Targets};
use crate::dispatch::StepDispatcher;
use crate::keys::{parse_key_sequence, KeyCombo};
use crate::model::AutomationOutcome;
use crate::ports::{EventOptions, InputEventType};

/// Key combinations sent to the focused element.
pub(crate) struct PressKey {
    options: ActionOptions,
}

impl PressKey {
    pub(crate) fn new(options: ActionOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl ActionSteps for PressKey {
    fn readiness(&self) -> Readiness {
        Readiness::Attached
    }

    fn default_target(&self) -> Option<ElementTarget> {
        Some(ElementTarget::ActiveElement)
    }

    async fn perform(
        &self,
        steps: &StepDispatcher<'_>,
        targets: Targets,
    ) -> Result<AutomationOutcome, AutomationError> {
        let raw = self.options.keys.as_deref().unwrap_or_default();
        let combos = parse_key_sequence(raw)
            .map_err(|err| AutomationError::command_validation("keys", err.to_string()))?;
        for (index, combo) in combos.iter().enumerate() {
            if index > 0 {
                steps.step_pause().await?;
            }
            press_combo(steps, &targets.primary.element, combo).await?;
        }
        Ok(AutomationOutcome::Done)
    }
}

/// keydown for each modifier then the key, keyup in reverse order.
async fn press_combo(
    steps: &StepDispatcher<'_>,
    element: &ElementRef,
    combo: &KeyCombo,
) -> Result<(), AutomationError> {
    let mut pressed: Vec<String> = combo
        .modifier_keys()
        .into_iter()
        .map(str::to_string)
        .collect();
    if let Some(key) = &combo.key {
        pressed.push(key.clone());
    }
    let keyed = |key: &str| EventOptions {
        key: Some(key.to_string()),
        modifiers: combo.modifiers,
        ..EventOptions::default()
    };

    for key in &pressed {
        steps.emit(InputEventType::KeyDown, element, keyed(key)).await?;
    }
    if let (Some(key), Some(text)) = (&combo.key, combo.text()) {
        steps.emit(InputEventType::KeyPress, element, keyed(key)).await?;
        steps
            .emit(
                InputEventType::Input,
                element,
                EventOptions {
                    text: Some(text),
                    ..EventOptions::default()
                },
            )
            .await?;
    }
    for key in pressed.iter().rev() {
        steps.emit(InputEventType::KeyUp, element, keyed(key)).await?;
    }
    Ok(())
}
