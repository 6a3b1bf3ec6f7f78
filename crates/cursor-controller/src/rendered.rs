use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autopilot_core_types::{AutomationError, Point};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::overlay::CursorOverlay;
use crate::state::{CursorState, MouseButton};
use crate::{CursorConfig, CursorUi};

/// Cursor with a visual indicator. Moves are animated frame by frame and the
/// logical position follows the drawn position.
pub struct RenderedCursor {
    state: Mutex<CursorState>,
    overlay: Arc<dyn CursorOverlay>,
    move_duration: Duration,
    frame_interval: Duration,
}

impl RenderedCursor {
    pub fn new(config: &CursorConfig, overlay: Arc<dyn CursorOverlay>) -> Self {
        Self {
            state: Mutex::new(CursorState::new(config.start, true)),
            overlay,
            move_duration: config.move_duration(),
            frame_interval: config.frame_interval(),
        }
    }

    pub async fn show(&self) {
        let mut state = self.state.lock().await;
        state.visible = true;
        self.overlay.set_visible(true).await;
    }

    pub async fn hide(&self) {
        let mut state = self.state.lock().await;
        state.visible = false;
        self.overlay.set_visible(false).await;
    }

    pub async fn is_visible(&self) -> bool {
        self.state.lock().await.visible
    }

    fn frame_count(&self) -> u32 {
        if self.frame_interval.is_zero() {
            return 1;
        }
        let frames = self.move_duration.as_millis() / self.frame_interval.as_millis().max(1);
        frames.clamp(1, u32::MAX as u128) as u32
    }
}

#[async_trait]
impl CursorUi for RenderedCursor {
    fn should_render(&self) -> bool {
        true
    }

    async fn snapshot(&self) -> CursorState {
        *self.state.lock().await
    }

    async fn move_to(
        &self,
        position: Point,
        cancel: &CancellationToken,
    ) -> Result<(), AutomationError> {
        // Held for the whole animation: a second move waits for this one.
        let mut state = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(AutomationError::Timeout("cursor move cancelled".into()));
            }
            guard = self.state.lock() => guard,
        };

        let from = state.position;
        if from == position {
            self.overlay.draw(position, state.button).await;
            return Ok(());
        }

        let frames = self.frame_count();
        debug!(%from, to = %position, frames, "animating cursor move");
        for frame in 1..=frames {
            let point = if frame == frames {
                position
            } else {
                from.lerp(position, f64::from(frame) / f64::from(frames))
            };
            self.overlay.draw(point, state.button).await;
            state.position = point;
            trace!(frame, %point, "cursor frame");

            if frame < frames {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(AutomationError::Timeout(format!(
                            "cursor move cancelled at {point}"
                        )));
                    }
                    _ = tokio::time::sleep(self.frame_interval) => {}
                }
            }
        }
        Ok(())
    }

    async fn left_button_down(&self) -> Result<(), AutomationError> {
        let mut state = self.state.lock().await;
        state.press(MouseButton::Left)?;
        self.overlay.draw(state.position, state.button).await;
        Ok(())
    }

    async fn right_button_down(&self) -> Result<(), AutomationError> {
        let mut state = self.state.lock().await;
        state.press(MouseButton::Right)?;
        self.overlay.draw(state.position, state.button).await;
        Ok(())
    }

    async fn button_up(&self) -> Result<(), AutomationError> {
        let mut state = self.state.lock().await;
        if state.release().is_some() {
            self.overlay.draw(state.position, None).await;
        }
        Ok(())
    }
}
