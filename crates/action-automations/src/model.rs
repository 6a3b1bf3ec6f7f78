use std::fmt;
use std::sync::Arc;

use autopilot_core_types::{ErrorKind, Point};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::ports::SelectionRange;

/// Value an automation resolves with.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum AutomationOutcome {
    Done,
    /// Final cursor position after a drag.
    CursorPosition(Point),
    Selection(SelectionRange),
    /// Scroll offset of the scrolled element afterwards.
    ScrollPosition(Point),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AutomationState {
    Created,
    Resolving,
    AwaitingReadiness,
    Validating,
    Dispatching,
    Resolved,
    Rejected(ErrorKind),
}

impl AutomationState {
    fn rank(&self) -> u8 {
        match self {
            AutomationState::Created => 0,
            AutomationState::Resolving => 1,
            AutomationState::AwaitingReadiness => 2,
            AutomationState::Validating => 3,
            AutomationState::Dispatching => 4,
            AutomationState::Resolved | AutomationState::Rejected(_) => 5,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, AutomationState::Resolved | AutomationState::Rejected(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AutomationState::Created => "created",
            AutomationState::Resolving => "resolving",
            AutomationState::AwaitingReadiness => "awaiting-readiness",
            AutomationState::Validating => "validating",
            AutomationState::Dispatching => "dispatching",
            AutomationState::Resolved => "resolved",
            AutomationState::Rejected(_) => "rejected",
        }
    }
}

impl fmt::Display for AutomationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomationState::Rejected(kind) => write!(f, "rejected({kind})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Shared view of an instance's state. Transitions only move forward and a
/// settled state is final.
#[derive(Clone, Debug)]
pub struct StateProbe {
    inner: Arc<RwLock<AutomationState>>,
}

impl StateProbe {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(AutomationState::Created)),
        }
    }

    pub fn current(&self) -> AutomationState {
        *self.inner.read()
    }

    pub(crate) fn advance(&self, next: AutomationState) -> bool {
        let mut state = self.inner.write();
        if state.is_settled() || next.rank() <= state.rank() {
            return false;
        }
        debug!(from = %*state, to = %next, "automation state transition");
        *state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_only_move_forward() {
        let probe = StateProbe::new();
        assert!(probe.advance(AutomationState::Resolving));
        assert!(!probe.advance(AutomationState::Created));
        // strict mode is optional, so Validating may be skipped
        assert!(probe.advance(AutomationState::Dispatching));
        assert!(probe.advance(AutomationState::Rejected(ErrorKind::Timeout)));
        assert!(!probe.advance(AutomationState::Resolved));
        assert_eq!(probe.current(), AutomationState::Rejected(ErrorKind::Timeout));
    }
}
