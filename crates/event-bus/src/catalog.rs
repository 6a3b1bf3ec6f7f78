//! Closed catalog of automation lifecycle events.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use autopilot_core_types::{ElementRef, Point, Rect};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{EventBus, InMemoryBus};

const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EventKind {
    TargetElementFound,
    Warning,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TargetElementFound => "TARGET_ELEMENT_FOUND",
            EventKind::Warning => "WARNING",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal anomaly observed while dispatching an action.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AutomationWarning {
    /// The target's bounding box changed between aiming and dispatch.
    ElementMoved {
        element: ElementRef,
        from: Rect,
        to: Rect,
    },
    /// Another element sits on top of the target at the action point.
    ElementOverlapped {
        element: ElementRef,
        top_element: ElementRef,
        point: Point,
    },
    /// Focus did not land on the element the keystrokes are meant for.
    FocusChanged {
        expected: ElementRef,
        actual: Option<ElementRef>,
    },
}

impl fmt::Display for AutomationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomationWarning::ElementMoved { element, from, to } => write!(
                f,
                "{element} moved from {} to {} during the action",
                from.top_left(),
                to.top_left()
            ),
            AutomationWarning::ElementOverlapped {
                element,
                top_element,
                point,
            } => write!(f, "{element} is overlapped by {top_element} at {point}"),
            AutomationWarning::FocusChanged { expected, actual } => match actual {
                Some(actual) => write!(f, "expected focus on {expected}, found {actual}"),
                None => write!(f, "expected focus on {expected}, nothing is focused"),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum AutomationEvent {
    #[serde(rename = "TARGET_ELEMENT_FOUND")]
    TargetElementFound(ElementRef),
    #[serde(rename = "WARNING")]
    Warning(AutomationWarning),
}

impl AutomationEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AutomationEvent::TargetElementFound(_) => EventKind::TargetElementFound,
            AutomationEvent::Warning(_) => EventKind::Warning,
        }
    }
}

/// Per-instance bus. Only catalog events can be emitted and
/// `TARGET_ELEMENT_FOUND` is delivered at most once.
pub struct LifecycleEvents {
    bus: Arc<InMemoryBus<AutomationEvent>>,
    found_emitted: AtomicBool,
}

impl LifecycleEvents {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bus: InMemoryBus::new(capacity),
            found_emitted: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AutomationEvent> {
        self.bus.subscribe()
    }

    pub fn bus(&self) -> Arc<InMemoryBus<AutomationEvent>> {
        Arc::clone(&self.bus)
    }

    /// Returns `false` when the event was already emitted for this instance.
    pub fn target_element_found(&self, element: &ElementRef) -> bool {
        if self.found_emitted.swap(true, Ordering::SeqCst) {
            return false;
        }
        debug!(%element, "target element found");
        self.bus
            .send(AutomationEvent::TargetElementFound(element.clone()));
        true
    }

    pub fn warning(&self, warning: AutomationWarning) {
        warn!(%warning, "automation warning");
        self.bus.send(AutomationEvent::Warning(warning));
    }

    pub fn target_found_emitted(&self) -> bool {
        self.found_emitted.load(Ordering::SeqCst)
    }
}

impl Default for LifecycleEvents {
    fn default() -> Self {
        Self::new()
    }
}
