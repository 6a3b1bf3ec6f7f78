use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use autopilot_core_types::{AutomationError, ElementRef, Point, Rect};
use command_protocol::{KeyMod, Selector};
use cursor_controller::MouseButton;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Element state as reported by the page, with the extra properties a
/// handler asked the selector layer for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub element: ElementRef,
    pub tag_name: String,
    pub bounds: Rect,
    pub attached: bool,
    pub visible: bool,
    pub editable: bool,
    pub content_editable: bool,
    pub value: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl ElementSnapshot {
    pub fn is_text_area(&self) -> bool {
        self.tag_name.eq_ignore_ascii_case("textarea")
    }

    pub fn text(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    pub fn text_len(&self) -> usize {
        self.text().chars().count()
    }
}

#[derive(Debug, Error, Clone)]
pub enum DomError {
    #[error("{element} is detached from the document")]
    Detached { element: ElementRef },
    #[error("property `{property}` of {element} could not be read: {reason}")]
    PropertyFetch {
        element: ElementRef,
        property: String,
        reason: String,
    },
    #[error("{element} does not exist")]
    UnknownElement { element: ElementRef },
    #[error("page error: {0}")]
    Page(String),
}

impl From<DomError> for AutomationError {
    fn from(err: DomError) -> Self {
        match err {
            DomError::PropertyFetch { .. } => AutomationError::ElementValidation(err.to_string()),
            other => AutomationError::execution_caused_by("page rejected the operation", other),
        }
    }
}

/// Selector service. An empty result means nothing matches yet.
#[async_trait]
pub trait SelectorPort: Send + Sync {
    async fn query(
        &self,
        selector: &Selector,
        properties: &[String],
    ) -> Result<Vec<ElementSnapshot>, DomError>;
}

/// Read-only probes against the live document.
#[async_trait]
pub trait DomPort: Send + Sync {
    /// `None` once the node no longer exists at all.
    async fn snapshot(
        &self,
        element: &ElementRef,
        properties: &[String],
    ) -> Result<Option<ElementSnapshot>, DomError>;

    /// Topmost element at a viewport point.
    async fn element_from_point(&self, point: Point) -> Result<Option<ElementRef>, DomError>;

    /// Whether `node` is `ancestor` or one of its descendants.
    async fn contains(&self, ancestor: &ElementRef, node: &ElementRef) -> Result<bool, DomError>;

    async fn focused_element(&self) -> Result<Option<ElementRef>, DomError>;

    async fn document_element(&self) -> Result<ElementRef, DomError>;

    /// Viewport point of the caret before character `offset`.
    async fn caret_point(&self, element: &ElementRef, offset: usize) -> Result<Point, DomError>;

    async fn scroll_position(&self, element: &ElementRef) -> Result<Point, DomError>;

    /// Largest scroll offsets the element accepts.
    async fn scroll_extent(&self, element: &ElementRef) -> Result<Point, DomError>;

    /// Visible area in viewport coordinates.
    async fn viewport(&self) -> Result<Rect, DomError>;
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputEventType {
    MouseMove,
    MouseOver,
    MouseDown,
    MouseUp,
    Click,
    DblClick,
    ContextMenu,
    KeyDown,
    KeyPress,
    KeyUp,
    Input,
    Wheel,
    Scroll,
    Select,
    Custom(String),
}

impl InputEventType {
    pub fn name(&self) -> &str {
        match self {
            InputEventType::MouseMove => "mousemove",
            InputEventType::MouseOver => "mouseover",
            InputEventType::MouseDown => "mousedown",
            InputEventType::MouseUp => "mouseup",
            InputEventType::Click => "click",
            InputEventType::DblClick => "dblclick",
            InputEventType::ContextMenu => "contextmenu",
            InputEventType::KeyDown => "keydown",
            InputEventType::KeyPress => "keypress",
            InputEventType::KeyUp => "keyup",
            InputEventType::Input => "input",
            InputEventType::Wheel => "wheel",
            InputEventType::Scroll => "scroll",
            InputEventType::Select => "select",
            InputEventType::Custom(name) => name,
        }
    }
}

/// Selection between two caret positions, possibly spanning elements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRange {
    pub anchor: ElementRef,
    pub anchor_offset: usize,
    pub focus: ElementRef,
    pub focus_offset: usize,
}

impl SelectionRange {
    pub fn within(element: ElementRef, start: usize, end: usize) -> Self {
        Self {
            anchor: element.clone(),
            anchor_offset: start,
            focus: element,
            focus_offset: end,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button: Option<MouseButton>,
    #[serde(default)]
    pub click_count: u8,
    #[serde(default)]
    pub modifiers: KeyMod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Text inserted by a `keypress` or `input` step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Replace the current value instead of inserting at the caret.
    #[serde(default)]
    pub replace: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

/// One simulated input step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub event_type: InputEventType,
    pub target: ElementRef,
    pub options: EventOptions,
}

/// Local input synthesis. The page applies the default action of each step
/// (focus on mousedown, text insertion on keypress/input, scrolling, selection).
#[async_trait]
pub trait InputPort: Send + Sync {
    async fn dispatch(&self, event: &InputEvent) -> Result<(), DomError>;
}

#[derive(Debug, Error, Clone)]
#[error("native dispatch failed: {0}")]
pub struct NativeDispatchError(pub String);

/// External input injector. When supplied, every step goes through it and the
/// engine keeps sequencing, timing and failure interpretation.
#[async_trait]
pub trait NativeDispatch: Send + Sync {
    async fn dispatch(
        &self,
        event_type: &InputEventType,
        target: &ElementRef,
        options: &EventOptions,
    ) -> Result<(), NativeDispatchError>;
}

/// Page access bundle for one browsing context.
#[derive(Clone)]
pub struct PagePorts {
    pub selector: Arc<dyn SelectorPort>,
    pub dom: Arc<dyn DomPort>,
    pub input: Arc<dyn InputPort>,
}

impl PagePorts {
    pub fn from_page<P>(page: Arc<P>) -> Self
    where
        P: SelectorPort + DomPort + InputPort + 'static,
    {
        Self {
            selector: page.clone(),
            dom: page.clone(),
            input: page,
        }
    }
}
