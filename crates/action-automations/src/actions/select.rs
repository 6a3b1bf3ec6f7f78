use async_trait::async_trait;
use autopilot_core_types::AutomationError;
use command_protocol::ActionOptions;
use cursor_controller::MouseButton;

use super::{ActionSteps, Targets};
use crate::dispatch::StepDispatcher;
use crate::model::AutomationOutcome;
use crate::ports::{ElementSnapshot, EventOptions, InputEventType, SelectionRange};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SelectMode {
    /// Character offsets inside an input or textarea.
    Text,
    /// Line and column pairs inside a textarea.
    TextArea,
    /// From the start of one content-editable element to the end of another.
    Editable,
}

pub(crate) struct Select {
    mode: SelectMode,
    options: ActionOptions,
}

impl Select {
    pub(crate) fn text(options: ActionOptions) -> Self {
        Self {
            mode: SelectMode::Text,
            options,
        }
    }

    pub(crate) fn text_area(options: ActionOptions) -> Self {
        Self {
            mode: SelectMode::TextArea,
            options,
        }
    }

    pub(crate) fn editable(options: ActionOptions) -> Self {
        Self {
            mode: SelectMode::Editable,
            options,
        }
    }

    fn range(&self, targets: &Targets) -> Result<SelectionRange, AutomationError> {
        let primary = &targets.primary;
        let len = primary.text_len();
        let options = &self.options;
        match self.mode {
            SelectMode::Text => {
                let start = options.start_pos.unwrap_or(0).min(len);
                let end = options.end_pos.unwrap_or(len).min(len);
                Ok(SelectionRange::within(primary.element.clone(), start, end))
            }
            SelectMode::TextArea => {
                let text = primary.text();
                let start = line_offset(
                    text,
                    options.start_line.unwrap_or(0),
                    options.start_pos.unwrap_or(0),
                );
                let end = match options.end_line {
                    Some(line) => line_offset(text, line, options.end_pos.unwrap_or(usize::MAX)),
                    None => len,
                };
                Ok(SelectionRange::within(primary.element.clone(), start, end))
            }
            SelectMode::Editable => {
                let end: &ElementSnapshot = targets.secondary.as_ref().ok_or_else(|| {
                    AutomationError::execution("selection end element was not resolved")
                })?;
                Ok(SelectionRange {
                    anchor: primary.element.clone(),
                    anchor_offset: 0,
                    focus: end.element.clone(),
                    focus_offset: end.text_len(),
                })
            }
        }
    }
}

/// Character offset of `column` on `line`, clamped to the line and the text.
pub(crate) fn line_offset(text: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    let mut lines = text.split('\n').peekable();
    let mut index = 0;
    while let Some(current) = lines.next() {
        let width = current.chars().count();
        if index == line || lines.peek().is_none() {
            return offset + column.min(width);
        }
        offset += width + 1;
        index += 1;
    }
    offset
}

#[async_trait]
impl ActionSteps for Select {
    fn uses_destination(&self) -> bool {
        self.mode == SelectMode::Editable
    }

    async fn perform(
        &self,
        steps: &StepDispatcher<'_>,
        targets: Targets,
    ) -> Result<AutomationOutcome, AutomationError> {
        let range = self.range(&targets)?;
        let dom = &steps.ports().dom;
        let from = dom.caret_point(&range.anchor, range.anchor_offset).await?;
        let to = dom.caret_point(&range.focus, range.focus_offset).await?;

        steps.move_cursor(from).await?;
        steps
            .emit(InputEventType::MouseMove, &range.anchor, steps.pointer(from, None, 0))
            .await?;
        steps.press(MouseButton::Left, &range.anchor, from, 1).await?;
        steps.step_pause().await?;
        let under = steps.drag_to(to, &range.focus).await?;
        steps.release(MouseButton::Left, &under, to, 1).await?;

        steps
            .emit(
                InputEventType::Select,
                &range.anchor,
                EventOptions {
                    selection: Some(range.clone()),
                    ..EventOptions::default()
                },
            )
            .await?;
        Ok(AutomationOutcome::Selection(range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_offsets_clamp_to_line_width() {
        let text = "ab\ncdef\ng";
        assert_eq!(line_offset(text, 0, 1), 1);
        assert_eq!(line_offset(text, 1, 0), 3);
        assert_eq!(line_offset(text, 1, 99), 7);
        assert_eq!(line_offset(text, 2, 1), 9);
        assert_eq!(line_offset(text, 9, 0), 8);
    }
}
