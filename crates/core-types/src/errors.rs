//! Error taxonomy shared by the registry, the cursor and the automations.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Underlying failure carried by [`AutomationError::ActionExecution`].
pub type BoxedCause = Arc<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error, Clone)]
pub enum AutomationError {
    /// The wire identifier has no registered handler.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A handler is already registered for the identifier.
    #[error("handler already registered for command: {0}")]
    DuplicateHandler(String),

    /// Command arguments violate a handler constraint.
    #[error("invalid command argument `{argument}`: {constraint}")]
    CommandValidation {
        argument: String,
        constraint: String,
    },

    /// No element matched the selector before the timeout elapsed.
    #[error("element not found: {0}")]
    ElementResolution(String),

    /// The element was found but failed handler-specific property checks.
    #[error("element rejected: {0}")]
    ElementValidation(String),

    /// The element became detached, invisible or obscured right before dispatch.
    #[error("element not interactable: {0}")]
    ElementNotInteractable(String),

    /// Illegal cursor button-state transition.
    #[error("cursor state error: {0}")]
    CursorState(String),

    /// Failure while dispatching the event sequence.
    #[error("action failed: {message}")]
    ActionExecution {
        message: String,
        #[source]
        cause: Option<BoxedCause>,
    },

    /// The run was cancelled or exceeded its deadline.
    #[error("action timed out: {0}")]
    Timeout(String),
}

/// Stable discriminant used by reporting code.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    UnknownCommand,
    DuplicateHandler,
    CommandValidation,
    ElementResolution,
    ElementValidation,
    ElementNotInteractable,
    CursorState,
    ActionExecution,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownCommand => "UnknownCommandError",
            ErrorKind::DuplicateHandler => "DuplicateHandlerError",
            ErrorKind::CommandValidation => "CommandValidationError",
            ErrorKind::ElementResolution => "ElementResolutionError",
            ErrorKind::ElementValidation => "ElementValidationError",
            ErrorKind::ElementNotInteractable => "ElementNotInteractableError",
            ErrorKind::CursorState => "CursorStateError",
            ErrorKind::ActionExecution => "ActionExecutionError",
            ErrorKind::Timeout => "TimeoutError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AutomationError {
    pub fn command_validation(argument: impl Into<String>, constraint: impl Into<String>) -> Self {
        AutomationError::CommandValidation {
            argument: argument.into(),
            constraint: constraint.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        AutomationError::ActionExecution {
            message: message.into(),
            cause: None,
        }
    }

    pub fn execution_caused_by<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AutomationError::ActionExecution {
            message: message.into(),
            cause: Some(Arc::new(cause)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AutomationError::UnknownCommand(_) => ErrorKind::UnknownCommand,
            AutomationError::DuplicateHandler(_) => ErrorKind::DuplicateHandler,
            AutomationError::CommandValidation { .. } => ErrorKind::CommandValidation,
            AutomationError::ElementResolution(_) => ErrorKind::ElementResolution,
            AutomationError::ElementValidation(_) => ErrorKind::ElementValidation,
            AutomationError::ElementNotInteractable(_) => ErrorKind::ElementNotInteractable,
            AutomationError::CursorState(_) => ErrorKind::CursorState,
            AutomationError::ActionExecution { .. } => ErrorKind::ActionExecution,
            AutomationError::Timeout(_) => ErrorKind::Timeout,
        }
    }

    /// Validation failures surface before any automation instance exists.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AutomationError::UnknownCommand(_)
                | AutomationError::CommandValidation { .. }
                | AutomationError::ElementValidation(_)
        )
    }

    /// Test-failure message the orchestrator shows for this error kind.
    pub fn user_message(&self) -> String {
        match self {
            AutomationError::UnknownCommand(id) => {
                format!("The \"{id}\" action is not supported by the automation engine.")
            }
            AutomationError::DuplicateHandler(id) => {
                format!("The \"{id}\" action is registered more than once.")
            }
            AutomationError::CommandValidation {
                argument,
                constraint,
            } => format!("The \"{argument}\" argument is invalid: {constraint}."),
            AutomationError::ElementResolution(detail) => {
                format!("The specified selector does not match any element in the DOM tree ({detail}).")
            }
            AutomationError::ElementValidation(detail) => {
                format!("The element cannot be used for this action: {detail}.")
            }
            AutomationError::ElementNotInteractable(detail) => format!(
                "The element was found but became unavailable right before the action ({detail})."
            ),
            AutomationError::CursorState(detail) => {
                format!("The cursor is in an unexpected state: {detail}.")
            }
            AutomationError::ActionExecution { message, cause } => match cause {
                Some(cause) => format!("The action failed: {message} ({cause})."),
                None => format!("The action failed: {message}."),
            },
            AutomationError::Timeout(detail) => {
                format!("The action did not complete in time: {detail}.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn execution_error_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = AutomationError::execution_caused_by("native dispatch rejected", io);
        assert_eq!(err.kind(), ErrorKind::ActionExecution);
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("pipe closed"));
        assert!(err.user_message().contains("pipe closed"));
    }

    #[test]
    fn validation_classification() {
        assert!(AutomationError::UnknownCommand("foo-bar".into()).is_validation());
        assert!(!AutomationError::Timeout("cancelled".into()).is_validation());
        assert_ne!(
            AutomationError::ElementResolution("x".into()).user_message(),
            AutomationError::ElementNotInteractable("x".into()).user_message()
        );
    }
}
