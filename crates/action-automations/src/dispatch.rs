use std::sync::Arc;
use std::time::Duration;

use autopilot_core_types::{AutomationError, ElementRef, Point, Rect};
use autopilot_event_bus::{AutomationWarning, LifecycleEvents};
use command_protocol::KeyMod;
use cursor_controller::{CursorUi, MouseButton};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::policy::AutomationPolicy;
use crate::ports::{
    ElementSnapshot, EventOptions, InputEvent, InputEventType, NativeDispatch, PagePorts,
};

/// Collaborators an automation instance is built with.
#[derive(Clone)]
pub struct AutomationDeps {
    pub ports: PagePorts,
    pub cursor: Arc<dyn CursorUi>,
    pub policy: AutomationPolicy,
    pub native: Option<Arc<dyn NativeDispatch>>,
}

impl AutomationDeps {
    pub fn new(ports: PagePorts, cursor: Arc<dyn CursorUi>, policy: AutomationPolicy) -> Self {
        Self {
            ports,
            cursor,
            policy,
            native: None,
        }
    }

    pub fn with_native(mut self, native: Arc<dyn NativeDispatch>) -> Self {
        self.native = Some(native);
        self
    }
}

/// Where pointer events land after the cursor arrived.
#[derive(Clone, Debug)]
pub(crate) struct Aim {
    pub point: Point,
    /// Element receiving the events: the target itself or whatever overlaps it.
    pub target: ElementRef,
    pub snapshot: ElementSnapshot,
}

/// Offsets are measured from the top-left corner, negative values from the
/// opposite edge. A missing offset aims at the center on that axis.
pub(crate) fn action_point(bounds: &Rect, offset_x: Option<f64>, offset_y: Option<f64>) -> Point {
    let center = bounds.center();
    let x = match offset_x {
        Some(dx) if dx < 0.0 => bounds.x + bounds.width + dx,
        Some(dx) => bounds.x + dx,
        None => center.x,
    };
    let y = match offset_y {
        Some(dy) if dy < 0.0 => bounds.y + bounds.height + dy,
        Some(dy) => bounds.y + dy,
        None => center.y,
    };
    Point::new(x, y)
}

/// Element on top of `element` at `point`, when it is not the element itself
/// or one of its descendants.
pub(crate) async fn overlapping_element(
    ports: &PagePorts,
    element: &ElementRef,
    point: Point,
) -> Result<Option<ElementRef>, AutomationError> {
    let Some(top) = ports.dom.element_from_point(point).await? else {
        return Ok(None);
    };
    if &top == element || ports.dom.contains(element, &top).await? {
        return Ok(None);
    }
    Ok(Some(top))
}

/// Sequencing and timing authority for one run. Every step goes through
/// here so cursor state, event order and cancellation stay consistent.
pub(crate) struct StepDispatcher<'a> {
    deps: &'a AutomationDeps,
    events: &'a LifecycleEvents,
    cancel: &'a CancellationToken,
    speed: f64,
    modifiers: KeyMod,
}

impl<'a> StepDispatcher<'a> {
    pub(crate) fn new(
        deps: &'a AutomationDeps,
        events: &'a LifecycleEvents,
        cancel: &'a CancellationToken,
        speed: f64,
        modifiers: KeyMod,
    ) -> Self {
        Self {
            deps,
            events,
            cancel,
            speed,
            modifiers,
        }
    }

    pub(crate) fn ports(&self) -> &PagePorts {
        &self.deps.ports
    }

    pub(crate) fn policy(&self) -> &AutomationPolicy {
        &self.deps.policy
    }

    pub(crate) fn warn(&self, warning: AutomationWarning) {
        self.events.warning(warning);
    }

    pub(crate) async fn cursor_position(&self) -> Point {
        self.deps.cursor.position().await
    }

    pub(crate) async fn move_cursor(&self, point: Point) -> Result<(), AutomationError> {
        self.deps.cursor.move_to(point, self.cancel).await
    }

    /// Cancellable pause. A zero delay returns without yielding.
    pub(crate) async fn pause(&self, delay: Duration) -> Result<(), AutomationError> {
        if delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AutomationError::Timeout("pause cancelled".into())),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    pub(crate) async fn step_pause(&self) -> Result<(), AutomationError> {
        self.pause(self.deps.policy.step_delay(self.speed)).await
    }

    pub(crate) async fn typing_pause(&self) -> Result<(), AutomationError> {
        self.pause(self.deps.policy.typing_delay(self.speed)).await
    }

    /// Sends one step, through the native backend when one is attached.
    pub(crate) async fn emit(
        &self,
        event_type: InputEventType,
        target: &ElementRef,
        mut options: EventOptions,
    ) -> Result<(), AutomationError> {
        options.modifiers |= self.modifiers;
        trace!(event = event_type.name(), %target, "dispatching step");
        match &self.deps.native {
            Some(native) => {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => Err(AutomationError::Timeout(format!(
                        "native dispatch of {} cancelled",
                        event_type.name()
                    ))),
                    result = native.dispatch(&event_type, target, &options) => {
                        result.map_err(|err| AutomationError::execution_caused_by(
                            format!("native dispatch of {} to {target} was rejected", event_type.name()),
                            err,
                        ))
                    }
                }
            }
            None => {
                let event = InputEvent {
                    event_type,
                    target: target.clone(),
                    options,
                };
                self.deps.ports.input.dispatch(&event).await.map_err(|err| {
                    AutomationError::execution_caused_by(
                        format!("dispatch of {} to {target} failed", event.event_type.name()),
                        err,
                    )
                })
            }
        }
    }

    /// Current state of an element that must still be in the document.
    pub(crate) async fn refresh(
        &self,
        element: &ElementRef,
    ) -> Result<ElementSnapshot, AutomationError> {
        match self.deps.ports.dom.snapshot(element, &[]).await? {
            Some(snapshot) if snapshot.attached => Ok(snapshot),
            _ => Err(AutomationError::execution(format!(
                "{element} was detached from the document during the action"
            ))),
        }
    }

    /// Scrolls the document until `point` of `snapshot` is inside the viewport.
    async fn bring_into_view(
        &self,
        snapshot: &ElementSnapshot,
        point: Point,
    ) -> Result<ElementSnapshot, AutomationError> {
        let viewport = self.deps.ports.dom.viewport().await?;
        if viewport.contains(point) {
            return Ok(snapshot.clone());
        }
        let center = viewport.center();
        let document = self.deps.ports.dom.document_element().await?;
        debug!(element = %snapshot.element, %point, "scrolling target into view");
        self.wheel(&document, Point::new(point.x - center.x, point.y - center.y))
            .await?;
        self.refresh(&snapshot.element).await
    }

    /// Moves the cursor onto the element and re-checks it after arrival. A
    /// moved element is re-aimed, an overlapped one hands its events to the
    /// element on top. Both only warn.
    pub(crate) async fn aim(
        &self,
        snapshot: &ElementSnapshot,
        offset_x: Option<f64>,
        offset_y: Option<f64>,
    ) -> Result<Aim, AutomationError> {
        let point = action_point(&snapshot.bounds, offset_x, offset_y);
        let snapshot = self.bring_into_view(snapshot, point).await?;
        let mut point = action_point(&snapshot.bounds, offset_x, offset_y);
        self.move_cursor(point).await?;

        let mut current = self.refresh(&snapshot.element).await?;
        if current.bounds != snapshot.bounds {
            self.warn(AutomationWarning::ElementMoved {
                element: current.element.clone(),
                from: snapshot.bounds,
                to: current.bounds,
            });
            point = action_point(&current.bounds, offset_x, offset_y);
            self.move_cursor(point).await?;
            current = self.refresh(&current.element).await?;
        }

        let target = match overlapping_element(&self.deps.ports, &current.element, point).await? {
            Some(top) => {
                self.warn(AutomationWarning::ElementOverlapped {
                    element: current.element.clone(),
                    top_element: top.clone(),
                    point,
                });
                top
            }
            None => current.element.clone(),
        };

        self.emit(InputEventType::MouseMove, &target, self.pointer(point, None, 0))
            .await?;
        Ok(Aim {
            point,
            target,
            snapshot: current,
        })
    }

    pub(crate) fn pointer(
        &self,
        client: Point,
        button: Option<MouseButton>,
        click_count: u8,
    ) -> EventOptions {
        EventOptions {
            client: Some(client),
            button,
            click_count,
            ..EventOptions::default()
        }
    }

    pub(crate) async fn press(
        &self,
        button: MouseButton,
        target: &ElementRef,
        point: Point,
        click_count: u8,
    ) -> Result<(), AutomationError> {
        match button {
            MouseButton::Left => self.deps.cursor.left_button_down().await?,
            MouseButton::Right => self.deps.cursor.right_button_down().await?,
        }
        self.emit(
            InputEventType::MouseDown,
            target,
            self.pointer(point, Some(button), click_count),
        )
        .await
    }

    pub(crate) async fn release(
        &self,
        button: MouseButton,
        target: &ElementRef,
        point: Point,
        click_count: u8,
    ) -> Result<(), AutomationError> {
        self.deps.cursor.button_up().await?;
        self.emit(
            InputEventType::MouseUp,
            target,
            self.pointer(point, Some(button), click_count),
        )
        .await
    }

    /// mousedown, mouseup and the follow-up click or contextmenu.
    pub(crate) async fn click_at(
        &self,
        aim: &Aim,
        button: MouseButton,
        click_count: u8,
    ) -> Result<(), AutomationError> {
        self.press(button, &aim.target, aim.point, click_count).await?;
        self.step_pause().await?;
        self.release(button, &aim.target, aim.point, click_count).await?;
        let follow_up = match button {
            MouseButton::Left => InputEventType::Click,
            MouseButton::Right => InputEventType::ContextMenu,
        };
        self.emit(
            follow_up,
            &aim.target,
            self.pointer(aim.point, Some(button), click_count),
        )
        .await
    }

    /// Moves the held cursor to `point`; the move event goes to whatever is
    /// under the pointer, falling back to `fallback`.
    pub(crate) async fn drag_to(
        &self,
        point: Point,
        fallback: &ElementRef,
    ) -> Result<ElementRef, AutomationError> {
        self.move_cursor(point).await?;
        let under = self
            .deps
            .ports
            .dom
            .element_from_point(point)
            .await?
            .unwrap_or_else(|| fallback.clone());
        self.emit(
            InputEventType::MouseMove,
            &under,
            self.pointer(point, Some(MouseButton::Left), 0),
        )
        .await?;
        Ok(under)
    }

    /// Scrolls `element` by `delta` in wheel-sized steps and reports the
    /// resulting scroll offset. The delta is clamped to the room left in the
    /// scroll extent and split into at most [`MAX_WHEEL_STEPS`] steps.
    pub(crate) async fn wheel(
        &self,
        element: &ElementRef,
        delta: Point,
    ) -> Result<Point, AutomationError> {
        let start = self.deps.ports.dom.scroll_position(element).await?;
        let extent = self.deps.ports.dom.scroll_extent(element).await?;
        let delta = clamp_scroll_delta(start, extent, delta);
        let longest = delta.x.abs().max(delta.y.abs());
        if longest > 0.0 {
            let steps = wheel_steps(longest, self.deps.policy.wheel_step_px);
            let step = Point::new(delta.x / steps as f64, delta.y / steps as f64);
            trace!(%element, steps, "wheel scrolling");
            for _ in 0..steps {
                if self.cancel.is_cancelled() {
                    return Err(AutomationError::Timeout("scroll cancelled".into()));
                }
                self.emit(
                    InputEventType::Wheel,
                    element,
                    EventOptions {
                        delta: Some(step),
                        ..EventOptions::default()
                    },
                )
                .await?;
                self.step_pause().await?;
                tokio::task::yield_now().await;
            }
            self.emit(InputEventType::Scroll, element, EventOptions::default())
                .await?;
        }
        Ok(self.deps.ports.dom.scroll_position(element).await?)
    }
}

/// Upper bound on wheel events per scroll; longer scrolls take bigger steps.
pub const MAX_WHEEL_STEPS: u32 = 200;

/// Limits `delta` so `start + delta` stays inside `[0, extent]` on each axis.
/// Non-finite components scroll nothing.
pub(crate) fn clamp_scroll_delta(start: Point, extent: Point, delta: Point) -> Point {
    let axis = |start: f64, extent: f64, delta: f64| {
        if !delta.is_finite() || !start.is_finite() || !extent.is_finite() {
            return 0.0;
        }
        (start + delta).clamp(0.0, extent.max(0.0)) - start
    };
    Point::new(
        axis(start.x, extent.x, delta.x),
        axis(start.y, extent.y, delta.y),
    )
}

fn wheel_steps(longest: f64, step_px: f64) -> u32 {
    let step_px = if step_px.is_finite() { step_px.max(1.0) } else { 1.0 };
    let steps = (longest / step_px).ceil();
    if steps >= MAX_WHEEL_STEPS as f64 {
        MAX_WHEEL_STEPS
    } else {
        (steps as u32).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_point_defaults_to_center_and_honors_edges() {
        let bounds = Rect::new(10.0, 20.0, 100.0, 40.0);
        assert_eq!(action_point(&bounds, None, None), Point::new(60.0, 40.0));
        assert_eq!(action_point(&bounds, Some(5.0), None), Point::new(15.0, 40.0));
        assert_eq!(
            action_point(&bounds, Some(-10.0), Some(-5.0)),
            Point::new(100.0, 55.0)
        );
    }

    #[test]
    fn scroll_delta_stops_at_the_extent() {
        let extent = Point::new(0.0, 1_400.0);
        assert_eq!(
            clamp_scroll_delta(Point::new(0.0, 200.0), extent, Point::new(50.0, 1e15)),
            Point::new(0.0, 1_200.0)
        );
        assert_eq!(
            clamp_scroll_delta(Point::new(0.0, 200.0), extent, Point::new(0.0, -1e15)),
            Point::new(0.0, -200.0)
        );
        assert_eq!(
            clamp_scroll_delta(Point::default(), extent, Point::new(f64::NAN, f64::INFINITY)),
            Point::default()
        );
    }

    #[test]
    fn wheel_steps_are_capped() {
        assert_eq!(wheel_steps(300.0, 100.0), 3);
        assert_eq!(wheel_steps(1.0, 100.0), 1);
        assert_eq!(wheel_steps(1e15, 100.0), MAX_WHEEL_STEPS);
        assert_eq!(wheel_steps(1e15, 0.0), MAX_WHEEL_STEPS);
        assert_eq!(wheel_steps(500.0, f64::NAN), MAX_WHEEL_STEPS);
    }
}
