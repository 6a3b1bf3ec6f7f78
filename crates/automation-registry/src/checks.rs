//! Pre-flight checks used by the default handlers.

use action_automations::{parse_key_sequence, ElementSnapshot, MIN_SPEED};
use autopilot_core_types::AutomationError;
use command_protocol::{ActionCommand, CommandType};

fn invalid(argument: &str, constraint: impl Into<String>) -> AutomationError {
    AutomationError::command_validation(argument, constraint)
}

pub fn speed_in_range(command: &ActionCommand) -> Result<(), AutomationError> {
    match command.options.speed {
        Some(speed) if !(MIN_SPEED..=1.0).contains(&speed) => Err(invalid(
            "speed",
            format!("must be between {MIN_SPEED} and 1, got {speed}"),
        )),
        _ => Ok(()),
    }
}

pub fn offsets_finite(command: &ActionCommand) -> Result<(), AutomationError> {
    let options = &command.options;
    let named = [
        ("offsetX", options.offset_x),
        ("offsetY", options.offset_y),
        ("dragOffsetX", options.drag_offset_x),
        ("dragOffsetY", options.drag_offset_y),
        ("destinationOffsetX", options.destination_offset_x),
        ("destinationOffsetY", options.destination_offset_y),
        ("x", options.x),
        ("y", options.y),
        ("byX", options.by_x),
        ("byY", options.by_y),
    ];
    for (argument, value) in named {
        if let Some(value) = value {
            if !value.is_finite() {
                return Err(invalid(argument, "must be a finite number"));
            }
        }
    }
    Ok(())
}

pub fn requires_target(command: &ActionCommand) -> Result<(), AutomationError> {
    if command.target.is_none() {
        return Err(invalid("target", "a target element is required"));
    }
    Ok(())
}

pub fn requires_destination(command: &ActionCommand) -> Result<(), AutomationError> {
    if command.destination.is_none() {
        return Err(invalid("destination", "a destination element is required"));
    }
    Ok(())
}

pub fn text_not_empty(command: &ActionCommand) -> Result<(), AutomationError> {
    match command.options.text.as_deref() {
        Some(text) if !text.is_empty() => Ok(()),
        _ => Err(invalid("text", "must be a non-empty string")),
    }
}

pub fn keys_parse(command: &ActionCommand) -> Result<(), AutomationError> {
    let keys = command.options.keys.as_deref().unwrap_or_default();
    parse_key_sequence(keys)
        .map(|_| ())
        .map_err(|err| invalid("keys", err.to_string()))
}

pub fn event_name_present(command: &ActionCommand) -> Result<(), AutomationError> {
    match command.options.event_name.as_deref() {
        Some(name) if !name.trim().is_empty() => Ok(()),
        _ => Err(invalid("eventName", "must be a non-empty string")),
    }
}

pub fn line_order(command: &ActionCommand) -> Result<(), AutomationError> {
    let options = &command.options;
    if let (Some(start), Some(end)) = (options.start_line, options.end_line) {
        if start > end {
            return Err(invalid(
                "startLine",
                format!("must not be greater than endLine ({start} > {end})"),
            ));
        }
    }
    Ok(())
}

/// Argument checks for an automation command type, in evaluation order.
pub fn command_checks(kind: CommandType) -> Vec<fn(&ActionCommand) -> Result<(), AutomationError>> {
    let mut checks: Vec<fn(&ActionCommand) -> Result<(), AutomationError>> =
        vec![speed_in_range, offsets_finite];
    match kind {
        CommandType::Click
        | CommandType::RightClick
        | CommandType::DoubleClick
        | CommandType::Hover
        | CommandType::Drag
        | CommandType::ScrollIntoView
        | CommandType::SelectText => checks.push(requires_target),
        CommandType::DragToElement | CommandType::SelectEditableContent => {
            checks.push(requires_target);
            checks.push(requires_destination);
        }
        CommandType::TypeText => {
            checks.push(requires_target);
            checks.push(text_not_empty);
        }
        CommandType::SelectTextAreaContent => {
            checks.push(requires_target);
            checks.push(line_order);
        }
        CommandType::PressKey => checks.push(keys_parse),
        CommandType::DispatchEvent => {
            checks.push(requires_target);
            checks.push(event_name_present);
        }
        _ => {}
    }
    checks
}

fn element_error(element: &ElementSnapshot, requirement: &str) -> AutomationError {
    AutomationError::ElementValidation(format!("{} must be {requirement}", element.element))
}

/// Property checks over the resolved elements, primary first.
pub fn element_checks(
    kind: CommandType,
    elements: &[ElementSnapshot],
) -> Result<(), AutomationError> {
    let Some(primary) = elements.first() else {
        return Ok(());
    };
    match kind {
        CommandType::TypeText if !(primary.editable || primary.content_editable) => {
            Err(element_error(primary, "an editable element"))
        }
        CommandType::SelectText if !(primary.editable || primary.content_editable) => Err(
            element_error(primary, "an editable text control or content-editable element"),
        ),
        CommandType::SelectTextAreaContent if !primary.is_text_area() => {
            Err(element_error(primary, "a textarea"))
        }
        CommandType::SelectEditableContent => {
            for element in elements {
                if !element.content_editable {
                    return Err(element_error(element, "content-editable"));
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
