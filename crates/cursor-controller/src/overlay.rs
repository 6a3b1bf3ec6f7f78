//! Visual overlay port driven by the rendered cursor.

use async_trait::async_trait;
use autopilot_core_types::Point;
use parking_lot::Mutex;

use crate::state::MouseButton;

#[async_trait]
pub trait CursorOverlay: Send + Sync {
    /// Draw one frame of the cursor indicator.
    async fn draw(&self, position: Point, button: Option<MouseButton>);
    async fn set_visible(&self, visible: bool);
}

/// Overlay that draws nothing.
#[derive(Clone, Debug, Default)]
pub struct NullOverlay;

#[async_trait]
impl CursorOverlay for NullOverlay {
    async fn draw(&self, _position: Point, _button: Option<MouseButton>) {}

    async fn set_visible(&self, _visible: bool) {}
}

#[derive(Clone, Debug, PartialEq)]
pub enum OverlayFrame {
    Draw {
        position: Point,
        button: Option<MouseButton>,
    },
    Visibility(bool),
}

/// Overlay that keeps every frame, for inspection in tests and traces.
#[derive(Debug, Default)]
pub struct RecordingOverlay {
    frames: Mutex<Vec<OverlayFrame>>,
}

impl RecordingOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<OverlayFrame> {
        self.frames.lock().clone()
    }

    pub fn last_position(&self) -> Option<Point> {
        self.frames.lock().iter().rev().find_map(|frame| match frame {
            OverlayFrame::Draw { position, .. } => Some(*position),
            OverlayFrame::Visibility(_) => None,
        })
    }
}

#[async_trait]
impl CursorOverlay for RecordingOverlay {
    async fn draw(&self, position: Point, button: Option<MouseButton>) {
        self.frames
            .lock()
            .push(OverlayFrame::Draw { position, button });
    }

    async fn set_visible(&self, visible: bool) {
        self.frames.lock().push(OverlayFrame::Visibility(visible));
    }
}
