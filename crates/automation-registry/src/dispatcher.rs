use std::sync::Arc;

use action_automations::{resolve_target, Automation, AutomationOutcome, AutomationState};
use autopilot_core_types::{AutomationError, ErrorKind, ExecCtx};
use autopilot_event_bus::{drain, AutomationEvent};
use command_protocol::{CommandMessage, ElementTarget, MessageError};
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::context::BrowsingContext;
use crate::registry::AutomationRegistry;

/// Result of one dispatched command, with everything its instance emitted.
#[derive(Debug)]
pub struct Execution {
    pub result: Result<AutomationOutcome, AutomationError>,
    pub events: Vec<AutomationEvent>,
    /// `None` when the command failed before an instance was created.
    pub final_state: Option<AutomationState>,
}

/// Runs the validation pipeline for wire messages and hands the result to
/// the registered factory.
#[derive(Clone)]
pub struct AutomationDispatcher {
    registry: Arc<AutomationRegistry>,
}

impl AutomationDispatcher {
    pub fn new(registry: Arc<AutomationRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AutomationRegistry {
        &self.registry
    }

    /// Handler lookup, argument checks, element resolution with the handler's
    /// extra properties, element checks, then `create`. Nothing touches the
    /// page or the cursor before the handler is known. Resolution settles
    /// with `Timeout` once `exec` is cancelled or past its deadline.
    #[instrument(skip_all, fields(command = %message.type_id, context = %context.id().0))]
    pub async fn prepare(
        &self,
        context: &BrowsingContext,
        message: &CommandMessage,
        exec: &ExecCtx,
    ) -> Result<Box<dyn Automation>, AutomationError> {
        let handler = self.registry.resolve(&message.type_id)?;
        let mut command = message.decode().map_err(|err| match err {
            MessageError::UnknownIdentifier(id) => AutomationError::UnknownCommand(id),
            malformed @ MessageError::Malformed { .. } => {
                AutomationError::command_validation("message", malformed.to_string())
            }
        })?;
        handler.ensure_cmd_args(&command)?;

        let props = handler.additional_selector_props();
        let kind = command.kind;
        let deadline = Instant::from_std(exec.deadline);
        let mut elements = Vec::new();
        for slot in [&mut command.target, &mut command.destination] {
            if let Some(target) = slot.as_mut() {
                // Selector polling answers to the command deadline, not only
                // to the selector timeout.
                let resolved = tokio::select! {
                    biased;
                    _ = exec.cancel.cancelled() => Err(AutomationError::Timeout(format!(
                        "{kind} was cancelled while resolving {target}"
                    ))),
                    _ = tokio::time::sleep_until(deadline) => Err(AutomationError::Timeout(format!(
                        "{kind} exceeded its deadline while resolving {target}"
                    ))),
                    resolved = resolve_target(context.ports(), target, props, context.policy(), &exec.cancel) => resolved,
                };
                let snapshot = match resolved {
                    Err(err) if err.kind() != ErrorKind::Timeout
                        && (exec.is_cancelled() || exec.is_timeout()) =>
                    {
                        return Err(AutomationError::Timeout(format!(
                            "{kind} was cancelled while resolving {target}: {err}"
                        )))
                    }
                    other => other?,
                };
                debug!(%target, element = %snapshot.element, "target resolved");
                *target = ElementTarget::Element(snapshot.element.clone());
                elements.push(snapshot);
            }
        }
        handler.ensure_els_props(&command, &elements)?;
        handler.create(&command, &elements, context.deps())
    }

    /// Prepares and runs one command. Commands against the same context run
    /// one at a time.
    pub async fn execute(
        &self,
        context: &BrowsingContext,
        message: &CommandMessage,
        exec: &ExecCtx,
        strict_element_check: Option<bool>,
    ) -> Execution {
        let _turn = context.take_turn().await;
        let automation = match self.prepare(context, message, exec).await {
            Ok(automation) => automation,
            Err(err) => {
                return Execution {
                    result: Err(err),
                    events: Vec::new(),
                    final_state: None,
                }
            }
        };
        let mut events = automation.subscribe();
        let probe = automation.probe();
        let strict = strict_element_check.unwrap_or(context.policy().strict_element_check);
        let result = automation.run(exec, strict).await;
        Execution {
            result,
            events: drain(&mut events),
            final_state: Some(probe.current()),
        }
    }
}
