//! Cursor controller
//!
//! Owns the simulated pointer of one browsing context: its position, the
//! single button that may be held and, for the rendered variant, the visual
//! indicator. State changes are serialized: a move holds the state lock until
//! the pointer has arrived, so moves and presses never interleave.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autopilot_core_types::{AutomationError, Point};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

mod headless;
pub mod overlay;
mod rendered;
pub mod state;

pub use headless::HeadlessCursor;
pub use overlay::{CursorOverlay, NullOverlay, OverlayFrame, RecordingOverlay};
pub use rendered::RenderedCursor;
pub use state::{CursorState, MouseButton};

/// Movement and button primitives shared by both cursor variants.
#[async_trait]
pub trait CursorUi: Send + Sync {
    fn should_render(&self) -> bool;

    async fn snapshot(&self) -> CursorState;

    async fn position(&self) -> Point {
        self.snapshot().await.position
    }

    /// Resolves once the cursor is at `position`.
    async fn move_to(&self, position: Point, cancel: &CancellationToken)
        -> Result<(), AutomationError>;

    /// Fails with `CursorState` when a button is already down.
    async fn left_button_down(&self) -> Result<(), AutomationError>;

    /// Fails with `CursorState` when a button is already down.
    async fn right_button_down(&self) -> Result<(), AutomationError>;

    /// Releasing with no button down is a successful no-op.
    async fn button_up(&self) -> Result<(), AutomationError>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    pub render: bool,
    pub move_duration_ms: u64,
    pub frame_interval_ms: u64,
    pub start: Point,
}

impl CursorConfig {
    pub fn headless() -> Self {
        Self {
            render: false,
            ..Self::default()
        }
    }

    pub fn move_duration(&self) -> Duration {
        Duration::from_millis(self.move_duration_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            render: true,
            move_duration_ms: 200,
            frame_interval_ms: 16,
            start: Point::default(),
        }
    }
}

/// Cursor variant selected once, when the browsing context is created.
pub enum CursorController {
    Rendered(RenderedCursor),
    Headless(HeadlessCursor),
}

impl CursorController {
    pub fn from_config(config: &CursorConfig, overlay: Arc<dyn CursorOverlay>) -> Self {
        if config.render {
            CursorController::Rendered(RenderedCursor::new(config, overlay))
        } else {
            CursorController::Headless(HeadlessCursor::new(config.start))
        }
    }

    pub fn headless() -> Self {
        CursorController::Headless(HeadlessCursor::default())
    }

    /// Visual controls, present only on the rendered variant.
    pub fn rendered(&self) -> Option<&RenderedCursor> {
        match self {
            CursorController::Rendered(cursor) => Some(cursor),
            CursorController::Headless(_) => None,
        }
    }

    fn inner(&self) -> &dyn CursorUi {
        match self {
            CursorController::Rendered(cursor) => cursor,
            CursorController::Headless(cursor) => cursor,
        }
    }
}

#[async_trait]
impl CursorUi for CursorController {
    fn should_render(&self) -> bool {
        self.inner().should_render()
    }

    async fn snapshot(&self) -> CursorState {
        self.inner().snapshot().await
    }

    async fn move_to(
        &self,
        position: Point,
        cancel: &CancellationToken,
    ) -> Result<(), AutomationError> {
        self.inner().move_to(position, cancel).await
    }

    async fn left_button_down(&self) -> Result<(), AutomationError> {
        self.inner().left_button_down().await
    }

    async fn right_button_down(&self) -> Result<(), AutomationError> {
        self.inner().right_button_down().await
    }

    async fn button_up(&self) -> Result<(), AutomationError> {
        self.inner().button_up().await
    }
}
