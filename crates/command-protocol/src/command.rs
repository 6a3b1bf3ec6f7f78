//! Validated description of one requested action.

use std::fmt;

use autopilot_core_types::ElementRef;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::table::CommandType;

bitflags! {
    /// Modifier keys held while the action runs.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
    pub struct KeyMod: u8 {
        const CTRL = 0b0001;
        const SHIFT = 0b0010;
        const ALT = 0b0100;
        const META = 0b1000;
    }
}

/// Selector string understood by the selector service.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(pub String);

impl Selector {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "css:{}", self.0)
    }
}

/// How an action addresses its element.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "camelCase")]
pub enum ElementTarget {
    /// Resolved by polling the selector service.
    Selector(Selector),
    /// Reference resolved earlier by the orchestrator.
    Element(ElementRef),
    /// Whatever element currently has focus, falling back to the document element.
    ActiveElement,
    /// The document element.
    Document,
}

impl ElementTarget {
    pub fn css(raw: impl Into<String>) -> Self {
        ElementTarget::Selector(Selector::new(raw))
    }
}

impl fmt::Display for ElementTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementTarget::Selector(selector) => write!(f, "{selector}"),
            ElementTarget::Element(element) => write!(f, "{element}"),
            ElementTarget::ActiveElement => f.write_str("active-element"),
            ElementTarget::Document => f.write_str("document"),
        }
    }
}

/// Where `scroll` places the viewport relative to the element.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScrollPosition {
    Top,
    Right,
    Bottom,
    Left,
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
    Center,
}

/// Action-specific options. Fields a given action does not use are ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionOptions {
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
    pub modifiers: KeyMod,
    pub speed: Option<f64>,

    pub text: Option<String>,
    pub replace: bool,
    pub paste: bool,
    pub confidential: bool,
    pub caret_pos: Option<usize>,

    pub drag_offset_x: Option<f64>,
    pub drag_offset_y: Option<f64>,
    pub destination_offset_x: Option<f64>,
    pub destination_offset_y: Option<f64>,

    pub start_pos: Option<usize>,
    pub end_pos: Option<usize>,
    pub start_line: Option<usize>,
    pub end_line: Option<usize>,

    pub keys: Option<String>,

    pub x: Option<f64>,
    pub y: Option<f64>,
    pub by_x: Option<f64>,
    pub by_y: Option<f64>,
    pub position: Option<ScrollPosition>,

    pub event_name: Option<String>,
    pub event_init: Option<serde_json::Value>,
}

impl ActionOptions {
    pub fn offset(&self) -> (f64, f64) {
        (self.offset_x.unwrap_or(0.0), self.offset_y.unwrap_or(0.0))
    }

    pub fn speed_or(&self, default: f64) -> f64 {
        self.speed.unwrap_or(default)
    }
}

/// One requested action. Serialized as the wire message: the `type` field
/// carries the wire identifier, never the abstract action name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCommand {
    #[serde(rename = "type")]
    pub kind: CommandType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ElementTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<ElementTarget>,
    #[serde(flatten)]
    pub options: ActionOptions,
}

impl ActionCommand {
    pub fn new(kind: CommandType) -> Self {
        Self {
            kind,
            target: None,
            destination: None,
            options: ActionOptions::default(),
        }
    }

    pub fn targeting(kind: CommandType, target: ElementTarget) -> Self {
        Self::new(kind).with_target(target)
    }

    pub fn click(target: ElementTarget) -> Self {
        Self::targeting(CommandType::Click, target)
    }

    pub fn right_click(target: ElementTarget) -> Self {
        Self::targeting(CommandType::RightClick, target)
    }

    pub fn double_click(target: ElementTarget) -> Self {
        Self::targeting(CommandType::DoubleClick, target)
    }

    pub fn hover(target: ElementTarget) -> Self {
        Self::targeting(CommandType::Hover, target)
    }

    pub fn drag(target: ElementTarget, drag_offset_x: f64, drag_offset_y: f64) -> Self {
        let mut command = Self::targeting(CommandType::Drag, target);
        command.options.drag_offset_x = Some(drag_offset_x);
        command.options.drag_offset_y = Some(drag_offset_y);
        command
    }

    pub fn drag_to_element(source: ElementTarget, destination: ElementTarget) -> Self {
        Self::targeting(CommandType::DragToElement, source).with_destination(destination)
    }

    pub fn type_text(target: ElementTarget, text: impl Into<String>) -> Self {
        let mut command = Self::targeting(CommandType::TypeText, target);
        command.options.text = Some(text.into());
        command
    }

    pub fn select_text(target: ElementTarget, start_pos: usize, end_pos: usize) -> Self {
        let mut command = Self::targeting(CommandType::SelectText, target);
        command.options.start_pos = Some(start_pos);
        command.options.end_pos = Some(end_pos);
        command
    }

    pub fn press_key(keys: impl Into<String>) -> Self {
        let mut command = Self::new(CommandType::PressKey);
        command.options.keys = Some(keys.into());
        command
    }

    pub fn scroll_by(by_x: f64, by_y: f64) -> Self {
        let mut command = Self::new(CommandType::ScrollBy);
        command.options.by_x = Some(by_x);
        command.options.by_y = Some(by_y);
        command
    }

    pub fn dispatch_event(target: ElementTarget, event_name: impl Into<String>) -> Self {
        let mut command = Self::targeting(CommandType::DispatchEvent, target);
        command.options.event_name = Some(event_name.into());
        command
    }

    pub fn with_target(mut self, target: ElementTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_destination(mut self, destination: ElementTarget) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_offset(mut self, offset_x: f64, offset_y: f64) -> Self {
        self.options.offset_x = Some(offset_x);
        self.options.offset_y = Some(offset_y);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.options.speed = Some(speed);
        self
    }

    pub fn with_modifiers(mut self, modifiers: KeyMod) -> Self {
        self.options.modifiers = modifiers;
        self
    }

    pub fn with_options(mut self, options: ActionOptions) -> Self {
        self.options = options;
        self
    }
}
