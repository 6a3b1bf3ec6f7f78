use async_trait::async_trait;
use autopilot_core_types::{AutomationError, Point};
use command_protocol::{ActionOptions, ElementTarget, ScrollPosition};

use super::{ActionSteps, Readiness, Targets};
use crate::dispatch::{action_point, StepDispatcher};
use crate::model::AutomationOutcome;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ScrollMode {
    /// Absolute offsets or a named position inside the element.
    ToPosition,
    ByDelta,
    /// Scroll the document until the element is visible.
    IntoView,
}

pub(crate) struct Scroll {
    mode: ScrollMode,
    options: ActionOptions,
}

impl Scroll {
    pub(crate) fn to_position(options: ActionOptions) -> Self {
        Self {
            mode: ScrollMode::ToPosition,
            options,
        }
    }

    pub(crate) fn by_delta(options: ActionOptions) -> Self {
        Self {
            mode: ScrollMode::ByDelta,
            options,
        }
    }

    pub(crate) fn into_view(options: ActionOptions) -> Self {
        Self {
            mode: ScrollMode::IntoView,
            options,
        }
    }
}

/// Scroll offset for a named position given the scrollable extent.
pub(crate) fn named_position(position: ScrollPosition, extent: Point) -> Point {
    let (mid_x, mid_y) = (extent.x / 2.0, extent.y / 2.0);
    match position {
        ScrollPosition::Top => Point::new(mid_x, 0.0),
        ScrollPosition::Right => Point::new(extent.x, mid_y),
        ScrollPosition::Bottom => Point::new(mid_x, extent.y),
        ScrollPosition::Left => Point::new(0.0, mid_y),
        ScrollPosition::TopRight => Point::new(extent.x, 0.0),
        ScrollPosition::TopLeft => Point::new(0.0, 0.0),
        ScrollPosition::BottomRight => extent,
        ScrollPosition::BottomLeft => Point::new(0.0, extent.y),
        ScrollPosition::Center => Point::new(mid_x, mid_y),
    }
}

#[async_trait]
impl ActionSteps for Scroll {
    fn readiness(&self) -> Readiness {
        Readiness::Attached
    }

    fn default_target(&self) -> Option<ElementTarget> {
        match self.mode {
            ScrollMode::IntoView => None,
            ScrollMode::ToPosition | ScrollMode::ByDelta => Some(ElementTarget::Document),
        }
    }

    async fn perform(
        &self,
        steps: &StepDispatcher<'_>,
        targets: Targets,
    ) -> Result<AutomationOutcome, AutomationError> {
        let dom = &steps.ports().dom;
        let options = &self.options;
        let element = targets.primary.element;

        let position = match self.mode {
            ScrollMode::ToPosition => {
                let extent = dom.scroll_extent(&element).await?;
                let current = dom.scroll_position(&element).await?;
                let wanted = match (options.x, options.y, options.position) {
                    (None, None, Some(position)) => named_position(position, extent),
                    (x, y, _) => Point::new(x.unwrap_or(current.x), y.unwrap_or(current.y)),
                };
                let wanted = Point::new(
                    wanted.x.clamp(0.0, extent.x.max(0.0)),
                    wanted.y.clamp(0.0, extent.y.max(0.0)),
                );
                steps
                    .wheel(&element, Point::new(wanted.x - current.x, wanted.y - current.y))
                    .await?
            }
            ScrollMode::ByDelta => {
                let delta = Point::new(options.by_x.unwrap_or(0.0), options.by_y.unwrap_or(0.0));
                steps.wheel(&element, delta).await?
            }
            ScrollMode::IntoView => {
                let document = dom.document_element().await?;
                let viewport = dom.viewport().await?;
                let point = action_point(&targets.primary.bounds, options.offset_x, options.offset_y);
                if viewport.contains(point) {
                    dom.scroll_position(&document).await?
                } else {
                    let center = viewport.center();
                    steps
                        .wheel(&document, Point::new(point.x - center.x, point.y - center.y))
                        .await?
                }
            }
        };
        Ok(AutomationOutcome::ScrollPosition(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_positions_cover_the_extent() {
        let extent = Point::new(200.0, 100.0);
        assert_eq!(named_position(ScrollPosition::TopLeft, extent), Point::new(0.0, 0.0));
        assert_eq!(named_position(ScrollPosition::BottomRight, extent), extent);
        assert_eq!(named_position(ScrollPosition::Center, extent), Point::new(100.0, 50.0));
        assert_eq!(named_position(ScrollPosition::Left, extent), Point::new(0.0, 50.0));
    }
}
