//! Event choreography per command type.

use async_trait::async_trait;
use autopilot_core_types::AutomationError;
use command_protocol::{ActionCommand, CommandType, ElementTarget};

use crate::dispatch::{AutomationDeps, StepDispatcher};
use crate::instance::{Automation, AutomationInstance, UnsupportedAutomation};
use crate::model::AutomationOutcome;
use crate::ports::ElementSnapshot;

mod click;
mod dispatch_event;
mod drag;
mod hover;
mod press_key;
mod scroll;
mod select;
mod type_text;

/// What the strict pre-dispatch check verifies.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Readiness {
    /// Attached, visible and not obscured at the action point.
    Pointer,
    /// Attached only; the action never aims the cursor at the element.
    Attached,
}

pub(crate) struct Targets {
    pub primary: ElementSnapshot,
    pub secondary: Option<ElementSnapshot>,
}

#[async_trait]
pub(crate) trait ActionSteps: Send + Sync {
    fn readiness(&self) -> Readiness {
        Readiness::Pointer
    }

    /// Target used when the command names none.
    fn default_target(&self) -> Option<ElementTarget> {
        None
    }

    fn uses_destination(&self) -> bool {
        false
    }

    async fn perform(
        &self,
        steps: &StepDispatcher<'_>,
        targets: Targets,
    ) -> Result<AutomationOutcome, AutomationError>;
}

/// Extra properties the selector layer fetches for a command type.
pub fn selector_properties(kind: CommandType) -> &'static [&'static str] {
    match kind {
        CommandType::TypeText => &["value", "isContentEditable"],
        CommandType::SelectText
        | CommandType::SelectTextAreaContent
        | CommandType::SelectEditableContent => &["value", "textContent"],
        _ => &[],
    }
}

fn steps_for(command: &ActionCommand) -> Option<Box<dyn ActionSteps>> {
    let options = command.options.clone();
    let steps: Box<dyn ActionSteps> = match command.kind {
        CommandType::Click => Box::new(click::Click::left(options)),
        CommandType::RightClick => Box::new(click::Click::right(options)),
        CommandType::DoubleClick => Box::new(click::Click::double(options)),
        CommandType::Hover => Box::new(hover::Hover::new(options)),
        CommandType::Drag => Box::new(drag::Drag::by_offset(options)),
        CommandType::DragToElement => Box::new(drag::Drag::to_element(options)),
        CommandType::TypeText => Box::new(type_text::TypeText::new(options)),
        CommandType::PressKey => Box::new(press_key::PressKey::new(options)),
        CommandType::Scroll => Box::new(scroll::Scroll::to_position(options)),
        CommandType::ScrollBy => Box::new(scroll::Scroll::by_delta(options)),
        CommandType::ScrollIntoView => Box::new(scroll::Scroll::into_view(options)),
        CommandType::SelectText => Box::new(select::Select::text(options)),
        CommandType::SelectTextAreaContent => Box::new(select::Select::text_area(options)),
        CommandType::SelectEditableContent => Box::new(select::Select::editable(options)),
        CommandType::DispatchEvent => Box::new(dispatch_event::DispatchEvent::new(options)),
        _ => return None,
    };
    Some(steps)
}

/// Factory shared by every default handler. The instance takes its own copy
/// of the command. Command types without input steps get an instance that
/// rejects when run.
pub fn build(
    command: &ActionCommand,
    deps: AutomationDeps,
) -> Result<Box<dyn Automation>, AutomationError> {
    let Some(steps) = steps_for(command) else {
        return Ok(Box::new(UnsupportedAutomation::new(command.kind)));
    };
    let properties = selector_properties(command.kind)
        .iter()
        .map(|name| name.to_string())
        .collect();
    Ok(Box::new(AutomationInstance::new(
        command.clone(),
        steps,
        properties,
        deps,
    )))
}
