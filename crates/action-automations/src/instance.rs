use async_trait::async_trait;
use autopilot_core_types::{AutomationError, ErrorKind, ExecCtx};
use autopilot_event_bus::{AutomationEvent, LifecycleEvents};
use command_protocol::{ActionCommand, CommandType, ElementTarget};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::actions::{ActionSteps, Readiness, Targets};
use crate::dispatch::{action_point, overlapping_element, AutomationDeps, StepDispatcher};
use crate::model::{AutomationOutcome, AutomationState, StateProbe};
use crate::ports::ElementSnapshot;
use crate::resolve::resolve_target;

/// One runnable command. `run` consumes the instance, so it executes once.
#[async_trait]
pub trait Automation: Send {
    fn command_type(&self) -> CommandType;

    fn state(&self) -> AutomationState;

    /// Handle that keeps reporting the state after `run` consumed the instance.
    fn probe(&self) -> StateProbe;

    fn subscribe(&self) -> broadcast::Receiver<AutomationEvent>;

    async fn run(
        self: Box<Self>,
        ctx: &ExecCtx,
        strict_element_check: bool,
    ) -> Result<AutomationOutcome, AutomationError>;
}

pub struct AutomationInstance {
    command: ActionCommand,
    steps: Box<dyn ActionSteps>,
    properties: Vec<String>,
    deps: AutomationDeps,
    events: LifecycleEvents,
    probe: StateProbe,
}

impl AutomationInstance {
    pub(crate) fn new(
        command: ActionCommand,
        steps: Box<dyn ActionSteps>,
        properties: Vec<String>,
        deps: AutomationDeps,
    ) -> Self {
        Self {
            command,
            steps,
            properties,
            deps,
            events: LifecycleEvents::new(),
            probe: StateProbe::new(),
        }
    }

    pub fn command(&self) -> &ActionCommand {
        &self.command
    }

    fn primary_target(&self) -> Result<ElementTarget, AutomationError> {
        self.command
            .target
            .clone()
            .or_else(|| self.steps.default_target())
            .ok_or_else(|| AutomationError::command_validation("target", "a target element is required"))
    }

    #[instrument(
        skip_all,
        fields(action = %ctx.action_id.0, command = %self.command.kind, strict = strict)
    )]
    async fn execute(
        &self,
        ctx: &ExecCtx,
        strict: bool,
    ) -> Result<AutomationOutcome, AutomationError> {
        let policy = &self.deps.policy;
        let ports = &self.deps.ports;

        self.probe.advance(AutomationState::Resolving);
        let target = self.primary_target()?;
        let primary =
            resolve_target(ports, &target, &self.properties, policy, &ctx.cancel).await?;

        self.probe.advance(AutomationState::AwaitingReadiness);
        self.events.target_element_found(&primary.element);

        let secondary = match (&self.command.destination, self.steps.uses_destination()) {
            (Some(destination), true) => Some(
                resolve_target(ports, destination, &self.properties, policy, &ctx.cancel).await?,
            ),
            (None, true) => {
                return Err(AutomationError::command_validation(
                    "destination",
                    "a destination element is required",
                ))
            }
            _ => None,
        };

        let (primary, secondary) = if strict {
            self.probe.advance(AutomationState::Validating);
            let primary = self.ensure_interactable(primary).await?;
            let secondary = match secondary {
                Some(snapshot) => Some(self.ensure_attached(snapshot).await?),
                None => None,
            };
            (primary, secondary)
        } else {
            (primary, secondary)
        };

        self.probe.advance(AutomationState::Dispatching);
        let options = &self.command.options;
        let steps = StepDispatcher::new(
            &self.deps,
            &self.events,
            &ctx.cancel,
            options.speed_or(policy.default_speed),
            options.modifiers,
        );
        self.steps
            .perform(&steps, Targets { primary, secondary })
            .await
    }

    async fn ensure_attached(
        &self,
        snapshot: ElementSnapshot,
    ) -> Result<ElementSnapshot, AutomationError> {
        let element = snapshot.element.clone();
        match self.deps.ports.dom.snapshot(&element, &[]).await? {
            Some(current) if current.attached => Ok(ElementSnapshot {
                bounds: current.bounds,
                visible: current.visible,
                ..snapshot
            }),
            _ => Err(AutomationError::ElementNotInteractable(format!(
                "{element} was removed from the document before the action started"
            ))),
        }
    }

    /// Strict re-check right before dispatch.
    async fn ensure_interactable(
        &self,
        snapshot: ElementSnapshot,
    ) -> Result<ElementSnapshot, AutomationError> {
        let snapshot = self.ensure_attached(snapshot).await?;
        if self.steps.readiness() == Readiness::Attached {
            return Ok(snapshot);
        }
        let element = &snapshot.element;
        if !snapshot.visible || snapshot.bounds.is_empty() {
            return Err(AutomationError::ElementNotInteractable(format!(
                "{element} is not visible"
            )));
        }
        let options = &self.command.options;
        let point = action_point(&snapshot.bounds, options.offset_x, options.offset_y);
        if let Some(top) = overlapping_element(&self.deps.ports, element, point).await? {
            return Err(AutomationError::ElementNotInteractable(format!(
                "{element} is obscured by {top} at {point}"
            )));
        }
        Ok(snapshot)
    }
}

#[async_trait]
impl Automation for AutomationInstance {
    fn command_type(&self) -> CommandType {
        self.command.kind
    }

    fn state(&self) -> AutomationState {
        self.probe.current()
    }

    fn probe(&self) -> StateProbe {
        self.probe.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<AutomationEvent> {
        self.events.subscribe()
    }

    async fn run(
        self: Box<Self>,
        ctx: &ExecCtx,
        strict_element_check: bool,
    ) -> Result<AutomationOutcome, AutomationError> {
        let deadline = tokio::time::Instant::from_std(ctx.deadline);
        let result = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                Err(AutomationError::Timeout(format!("{} was cancelled", self.command.kind)))
            }
            _ = tokio::time::sleep_until(deadline) => {
                Err(AutomationError::Timeout(format!("{} exceeded its deadline", self.command.kind)))
            }
            result = self.execute(ctx, strict_element_check) => result,
        };

        // Cancellation wins over a failure it raced with.
        let result = match result {
            Err(err) if err.kind() != ErrorKind::Timeout
                && (ctx.is_cancelled() || ctx.is_timeout()) =>
            {
                Err(AutomationError::Timeout(format!(
                    "{} was cancelled while failing: {err}",
                    self.command.kind
                )))
            }
            other => other,
        };

        match &result {
            Ok(outcome) => {
                self.probe.advance(AutomationState::Resolved);
                info!(command = %self.command.kind, ?outcome, "automation resolved");
            }
            Err(err) => {
                self.probe.advance(AutomationState::Rejected(err.kind()));
                warn!(command = %self.command.kind, kind = %err.kind(), %err, "automation rejected");
                // A press may have been left open by the interrupted sequence.
                if let Err(reset) = self.deps.cursor.button_up().await {
                    warn!(%reset, "cursor reset failed");
                }
            }
        }
        result
    }
}

/// Instance for a protocol command the engine has no input automation for.
/// It never touches the page or the cursor and always rejects.
pub struct UnsupportedAutomation {
    kind: CommandType,
    events: LifecycleEvents,
    probe: StateProbe,
}

impl UnsupportedAutomation {
    pub fn new(kind: CommandType) -> Self {
        Self {
            kind,
            events: LifecycleEvents::new(),
            probe: StateProbe::new(),
        }
    }
}

#[async_trait]
impl Automation for UnsupportedAutomation {
    fn command_type(&self) -> CommandType {
        self.kind
    }

    fn state(&self) -> AutomationState {
        self.probe.current()
    }

    fn probe(&self) -> StateProbe {
        self.probe.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<AutomationEvent> {
        self.events.subscribe()
    }

    async fn run(
        self: Box<Self>,
        ctx: &ExecCtx,
        _strict_element_check: bool,
    ) -> Result<AutomationOutcome, AutomationError> {
        let err = if ctx.is_cancelled() || ctx.is_timeout() {
            AutomationError::Timeout(format!("{} was cancelled", self.kind))
        } else {
            AutomationError::execution(format!(
                "{} is not an input automation and cannot run here",
                self.kind.wire_id()
            ))
        };
        self.probe.advance(AutomationState::Rejected(err.kind()));
        warn!(command = %self.kind, kind = %err.kind(), "unsupported command rejected");
        Err(err)
    }
}
