use async_trait::async_trait;
use autopilot_core_types::{AutomationError, Point};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::state::{CursorState, MouseButton};
use crate::CursorUi;

/// Cursor that only tracks logical state. Every call settles immediately,
/// with the same sequencing guarantees as the rendered variant.
#[derive(Debug)]
pub struct HeadlessCursor {
    state: Mutex<CursorState>,
}

impl HeadlessCursor {
    pub fn new(start: Point) -> Self {
        Self {
            state: Mutex::new(CursorState::new(start, false)),
        }
    }
}

impl Default for HeadlessCursor {
    fn default() -> Self {
        Self::new(Point::default())
    }
}

#[async_trait]
impl CursorUi for HeadlessCursor {
    fn should_render(&self) -> bool {
        false
    }

    async fn snapshot(&self) -> CursorState {
        *self.state.lock().await
    }

    async fn move_to(
        &self,
        position: Point,
        cancel: &CancellationToken,
    ) -> Result<(), AutomationError> {
        let mut state = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(AutomationError::Timeout("cursor move cancelled".into()));
            }
            guard = self.state.lock() => guard,
        };
        trace!(from = %state.position, to = %position, "headless cursor move");
        state.position = position;
        Ok(())
    }

    async fn left_button_down(&self) -> Result<(), AutomationError> {
        self.state.lock().await.press(MouseButton::Left)
    }

    async fn right_button_down(&self) -> Result<(), AutomationError> {
        self.state.lock().await.press(MouseButton::Right)
    }

    async fn button_up(&self) -> Result<(), AutomationError> {
        self.state.lock().await.release();
        Ok(())
    }
}
