use autopilot_core_types::{AutomationError, Point};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
}

/// Pointer state owned by a cursor controller.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CursorState {
    pub position: Point,
    pub visible: bool,
    pub button: Option<MouseButton>,
    pub should_render: bool,
}

impl CursorState {
    pub fn new(position: Point, should_render: bool) -> Self {
        Self {
            position,
            visible: false,
            button: None,
            should_render,
        }
    }

    pub(crate) fn press(&mut self, button: MouseButton) -> Result<(), AutomationError> {
        if let Some(held) = self.button {
            return Err(AutomationError::CursorState(format!(
                "cannot press {button:?} button while {held:?} button is down"
            )));
        }
        self.button = Some(button);
        Ok(())
    }

    /// Returns the released button, if any.
    pub(crate) fn release(&mut self) -> Option<MouseButton> {
        self.button.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_rejects_nested_buttons() {
        let mut state = CursorState::new(Point::default(), false);
        state.press(MouseButton::Left).unwrap();
        let err = state.press(MouseButton::Right).unwrap_err();
        assert!(matches!(err, AutomationError::CursorState(_)));
        assert_eq!(state.release(), Some(MouseButton::Left));
        assert_eq!(state.release(), None);
    }
}
