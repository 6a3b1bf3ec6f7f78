//! In-memory page implementing every page port.
//!
//! Elements are laid out in document coordinates; the document element's
//! scroll offset shifts them into viewport coordinates. Paint order is
//! `z_index` then insertion order. Default actions cover focus on
//! mousedown, text insertion on `input`, selection, backspace, select-all
//! and wheel scrolling, which is enough to observe what a run did.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use autopilot_core_types::{ElementRef, Point, Rect};
use command_protocol::{KeyMod, Selector};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::ports::{
    DomError, DomPort, ElementSnapshot, InputEvent, InputEventType, InputPort, SelectionRange,
    SelectorPort,
};

pub const DOCUMENT_ID: &str = "document";
const CHAR_WIDTH: f64 = 8.0;
const LINE_HEIGHT: f64 = 16.0;
const TEXT_INSET: f64 = 2.0;

fn default_tag() -> String {
    "div".into()
}

fn default_true() -> bool {
    true
}

/// Element fixture. Also the shape used by scenario files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageElement {
    pub id: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub classes: Vec<String>,
    /// Document coordinates.
    pub bounds: Rect,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub editable: bool,
    #[serde(default)]
    pub content_editable: bool,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default)]
    pub scroll_extent: Point,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl PageElement {
    pub fn new(id: impl Into<String>, tag: impl Into<String>, bounds: Rect) -> Self {
        Self {
            id: id.into(),
            tag: tag.into(),
            classes: Vec::new(),
            bounds,
            parent: None,
            visible: true,
            editable: false,
            content_editable: false,
            value: String::new(),
            z_index: 0,
            scroll_extent: Point::default(),
            properties: BTreeMap::new(),
        }
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn content_editable(mut self) -> Self {
        self.content_editable = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn with_scroll_extent(mut self, extent: Point) -> Self {
        self.scroll_extent = extent;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    fn focusable(&self) -> bool {
        self.editable || self.content_editable
    }
}

struct Node {
    element: PageElement,
    attached: bool,
    scroll: Point,
    /// Selected character range, caret when empty.
    caret: (usize, usize),
}

impl Node {
    fn new(element: PageElement) -> Self {
        let len = element.value.chars().count();
        Self {
            element,
            attached: true,
            scroll: Point::default(),
            caret: (len, len),
        }
    }

    fn text_len(&self) -> usize {
        self.element.value.chars().count()
    }
}

struct PageState {
    nodes: Vec<Node>,
    viewport: Rect,
    focused: Option<String>,
    selection: Option<SelectionRange>,
    log: Vec<InputEvent>,
    detach_on_resolve: HashSet<String>,
    failing_properties: HashSet<String>,
}

impl PageState {
    fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.element.id == id)
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.element.id == id)
    }

    fn document_scroll(&self) -> Point {
        self.node(DOCUMENT_ID)
            .map(|node| node.scroll)
            .unwrap_or_default()
    }

    fn viewport_bounds(&self, node: &Node) -> Rect {
        if node.element.id == DOCUMENT_ID {
            return self.viewport;
        }
        let scroll = self.document_scroll();
        node.element.bounds.translate(-scroll.x, -scroll.y)
    }

    fn is_descendant(&self, ancestor: &str, id: &str) -> bool {
        if ancestor == DOCUMENT_ID {
            return true;
        }
        let mut current = self.node(id).and_then(|node| node.element.parent.clone());
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.node(&parent).and_then(|node| node.element.parent.clone());
        }
        false
    }

    fn snapshot(&self, node: &Node, properties: &[String]) -> Result<ElementSnapshot, DomError> {
        let element = &node.element;
        let mut fetched = BTreeMap::new();
        for name in properties {
            if self.failing_properties.contains(name) {
                return Err(DomError::PropertyFetch {
                    element: ElementRef::new(element.id.clone()),
                    property: name.clone(),
                    reason: "property getter threw".into(),
                });
            }
            let value = match name.as_str() {
                "value" | "textContent" => Value::String(element.value.clone()),
                "isContentEditable" => Value::Bool(element.content_editable),
                "tagName" => Value::String(element.tag.to_ascii_uppercase()),
                other => element.properties.get(other).cloned().unwrap_or(Value::Null),
            };
            fetched.insert(name.clone(), value);
        }
        Ok(ElementSnapshot {
            element: ElementRef::new(element.id.clone()),
            tag_name: element.tag.clone(),
            bounds: self.viewport_bounds(node),
            attached: node.attached,
            visible: element.visible,
            editable: element.editable,
            content_editable: element.content_editable,
            value: Some(element.value.clone()),
            properties: fetched,
        })
    }

    fn matches(&self, node: &Node, selector: &[Compound]) -> bool {
        let Some((last, ancestors)) = selector.split_last() else {
            return false;
        };
        if !last.matches(&node.element) {
            return false;
        }
        let mut remaining = ancestors.iter().rev().peekable();
        let mut parent = node.element.parent.clone();
        while let Some(wanted) = remaining.peek() {
            let Some(id) = parent else {
                return false;
            };
            let Some(ancestor) = self.node(&id) else {
                return false;
            };
            if wanted.matches(&ancestor.element) {
                remaining.next();
            }
            parent = ancestor.element.parent.clone();
        }
        true
    }

    fn apply(&mut self, event: &InputEvent) {
        let target = event.target.as_str().to_string();
        let options = &event.options;
        match &event.event_type {
            InputEventType::MouseDown => {
                let focusable = self
                    .node(&target)
                    .map(|node| node.element.focusable())
                    .unwrap_or(false);
                self.focused = focusable.then(|| target.clone());
            }
            InputEventType::Input => {
                if let Some(text) = &options.text {
                    self.insert_text(&target, text, options.replace);
                }
            }
            InputEventType::Select => {
                if let Some(range) = &options.selection {
                    if range.anchor == range.focus {
                        if let Some(node) = self.node_mut(range.anchor.as_str()) {
                            let len = node.text_len();
                            let (a, b) = (range.anchor_offset.min(len), range.focus_offset.min(len));
                            node.caret = (a.min(b), a.max(b));
                        }
                    }
                    self.selection = Some(range.clone());
                }
            }
            InputEventType::KeyDown => match options.key.as_deref() {
                Some("Backspace") => self.backspace(&target),
                Some("a") | Some("A")
                    if options.modifiers.intersects(KeyMod::CTRL | KeyMod::META) =>
                {
                    if let Some(node) = self.node_mut(&target) {
                        node.caret = (0, node.text_len());
                    }
                }
                _ => {}
            },
            InputEventType::Wheel => {
                if let (Some(delta), Some(node)) = (options.delta, self.node_mut(&target)) {
                    let extent = node.element.scroll_extent;
                    node.scroll = Point::new(
                        (node.scroll.x + delta.x).clamp(0.0, extent.x.max(0.0)),
                        (node.scroll.y + delta.y).clamp(0.0, extent.y.max(0.0)),
                    );
                }
            }
            _ => {}
        }
    }

    fn insert_text(&mut self, target: &str, text: &str, replace: bool) {
        let Some(node) = self.node_mut(target) else {
            return;
        };
        if !node.element.focusable() {
            return;
        }
        let chars: Vec<char> = node.element.value.chars().collect();
        let (start, end) = if replace {
            (0, chars.len())
        } else {
            (node.caret.0.min(chars.len()), node.caret.1.min(chars.len()))
        };
        let mut value: String = chars[..start].iter().collect();
        value.push_str(text);
        value.extend(&chars[end..]);
        node.element.value = value;
        let caret = start + text.chars().count();
        node.caret = (caret, caret);
    }

    fn backspace(&mut self, target: &str) {
        let Some(node) = self.node_mut(target) else {
            return;
        };
        if !node.element.focusable() {
            return;
        }
        let mut chars: Vec<char> = node.element.value.chars().collect();
        let (start, end) = (node.caret.0.min(chars.len()), node.caret.1.min(chars.len()));
        let (start, end) = if start == end {
            (start.saturating_sub(1), end)
        } else {
            (start, end)
        };
        chars.drain(start..end);
        node.element.value = chars.into_iter().collect();
        node.caret = (start, start);
    }
}

/// `tag#id.class` compound, possibly with parts omitted.
#[derive(Debug, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn parse(raw: &str) -> Option<Self> {
        let mut compound = Compound::default();
        let mut rest = raw;
        let tag_end = rest.find(['#', '.']).unwrap_or(rest.len());
        if tag_end > 0 {
            compound.tag = Some(rest[..tag_end].to_ascii_lowercase());
        }
        rest = &rest[tag_end..];
        while !rest.is_empty() {
            let marker = rest.chars().next()?;
            let body = &rest[1..];
            let end = body.find(['#', '.']).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() {
                return None;
            }
            match marker {
                '#' => compound.id = Some(name.to_string()),
                _ => compound.classes.push(name.to_string()),
            }
            rest = &body[end..];
        }
        Some(compound)
    }

    fn matches(&self, element: &PageElement) -> bool {
        self.tag
            .as_ref()
            .map_or(true, |tag| element.tag.eq_ignore_ascii_case(tag))
            && self.id.as_ref().map_or(true, |id| &element.id == id)
            && self.classes.iter().all(|class| element.classes.contains(class))
    }
}

fn parse_selector(selector: &Selector) -> Result<Vec<Compound>, DomError> {
    selector
        .as_str()
        .split_whitespace()
        .map(|part| {
            Compound::parse(part)
                .ok_or_else(|| DomError::Page(format!("unsupported selector `{}`", selector.as_str())))
        })
        .collect()
}

pub struct MemoryPage {
    state: Mutex<PageState>,
}

impl MemoryPage {
    /// Empty document filling a `width` x `height` viewport.
    pub fn new(width: f64, height: f64) -> Self {
        let viewport = Rect::new(0.0, 0.0, width, height);
        let document = PageElement::new(DOCUMENT_ID, "html", viewport);
        Self {
            state: Mutex::new(PageState {
                nodes: vec![Node::new(document)],
                viewport,
                focused: None,
                selection: None,
                log: Vec::new(),
                detach_on_resolve: HashSet::new(),
                failing_properties: HashSet::new(),
            }),
        }
    }

    pub fn with_elements(width: f64, height: f64, elements: Vec<PageElement>) -> Self {
        let page = Self::new(width, height);
        for element in elements {
            page.insert(element);
        }
        page
    }

    /// Makes the document taller or wider than the viewport so it can scroll.
    pub fn set_document_size(&self, width: f64, height: f64) {
        let mut state = self.state.lock();
        let viewport = state.viewport;
        if let Some(document) = state.node_mut(DOCUMENT_ID) {
            document.element.bounds = Rect::new(0.0, 0.0, width, height);
            document.element.scroll_extent = Point::new(
                (width - viewport.width).max(0.0),
                (height - viewport.height).max(0.0),
            );
        }
    }

    pub fn insert(&self, element: PageElement) -> ElementRef {
        let reference = ElementRef::new(element.id.clone());
        let mut state = self.state.lock();
        state.nodes.retain(|node| node.element.id != element.id);
        state.nodes.push(Node::new(element));
        reference
    }

    /// Removes the element and its descendants from the document. References
    /// stay valid and report `attached == false`.
    pub fn detach(&self, id: &str) {
        let mut state = self.state.lock();
        let doomed: Vec<String> = state
            .nodes
            .iter()
            .map(|node| node.element.id.clone())
            .filter(|candidate| candidate == id || state.is_descendant(id, candidate))
            .collect();
        for node in state.nodes.iter_mut() {
            if doomed.contains(&node.element.id) {
                node.attached = false;
            }
        }
        if state.focused.as_deref().is_some_and(|focused| doomed.iter().any(|d| d == focused)) {
            state.focused = None;
        }
    }

    /// Detaches the element right after a selector query returns it.
    pub fn detach_on_resolve(&self, id: &str) {
        self.state.lock().detach_on_resolve.insert(id.to_string());
    }

    pub fn set_bounds(&self, id: &str, bounds: Rect) {
        if let Some(node) = self.state.lock().node_mut(id) {
            node.element.bounds = bounds;
        }
    }

    /// Every later fetch of `property` fails.
    pub fn fail_property(&self, property: &str) {
        self.state.lock().failing_properties.insert(property.to_string());
    }

    pub fn focus(&self, id: &str) {
        self.state.lock().focused = Some(id.to_string());
    }

    pub fn value(&self, id: &str) -> Option<String> {
        self.state.lock().node(id).map(|node| node.element.value.clone())
    }

    pub fn focused(&self) -> Option<ElementRef> {
        self.state.lock().focused.clone().map(ElementRef::new)
    }

    pub fn selection(&self) -> Option<SelectionRange> {
        self.state.lock().selection.clone()
    }

    pub fn scroll_of(&self, id: &str) -> Option<Point> {
        self.state.lock().node(id).map(|node| node.scroll)
    }

    pub fn events(&self) -> Vec<InputEvent> {
        self.state.lock().log.clone()
    }

    /// `"mousedown@button"` style entries, in dispatch order.
    pub fn event_log(&self) -> Vec<String> {
        self.state
            .lock()
            .log
            .iter()
            .map(|event| format!("{}@{}", event.event_type.name(), event.target.as_str()))
            .collect()
    }

    pub fn clear_events(&self) {
        self.state.lock().log.clear();
    }
}

#[async_trait]
impl SelectorPort for MemoryPage {
    async fn query(
        &self,
        selector: &Selector,
        properties: &[String],
    ) -> Result<Vec<ElementSnapshot>, DomError> {
        let compounds = parse_selector(selector)?;
        let mut state = self.state.lock();
        let mut found = Vec::new();
        for node in state.nodes.iter() {
            if node.attached && state.matches(node, &compounds) {
                found.push(state.snapshot(node, properties)?);
            }
        }
        trace!(%selector, matches = found.len(), "memory page query");
        let doomed: Vec<String> = found
            .iter()
            .map(|snapshot| snapshot.element.as_str().to_string())
            .filter(|id| state.detach_on_resolve.contains(id))
            .collect();
        if !doomed.is_empty() {
            for id in &doomed {
                state.detach_on_resolve.remove(id);
            }
            drop(state);
            for id in &doomed {
                self.detach(id);
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl DomPort for MemoryPage {
    async fn snapshot(
        &self,
        element: &ElementRef,
        properties: &[String],
    ) -> Result<Option<ElementSnapshot>, DomError> {
        let state = self.state.lock();
        match state.node(element.as_str()) {
            Some(node) => state.snapshot(node, properties).map(Some),
            None => Ok(None),
        }
    }

    async fn element_from_point(&self, point: Point) -> Result<Option<ElementRef>, DomError> {
        let state = self.state.lock();
        if !state.viewport.contains(point) {
            return Ok(None);
        }
        let top = state
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.attached && node.element.visible)
            .filter(|(_, node)| node.element.id != DOCUMENT_ID)
            .filter(|(_, node)| state.viewport_bounds(node).contains(point))
            .max_by_key(|(index, node)| (node.element.z_index, *index))
            .map(|(_, node)| node.element.id.clone())
            .unwrap_or_else(|| DOCUMENT_ID.to_string());
        Ok(Some(ElementRef::new(top)))
    }

    async fn contains(&self, ancestor: &ElementRef, node: &ElementRef) -> Result<bool, DomError> {
        let state = self.state.lock();
        Ok(ancestor == node || state.is_descendant(ancestor.as_str(), node.as_str()))
    }

    async fn focused_element(&self) -> Result<Option<ElementRef>, DomError> {
        Ok(self.focused())
    }

    async fn document_element(&self) -> Result<ElementRef, DomError> {
        Ok(ElementRef::new(DOCUMENT_ID))
    }

    async fn caret_point(&self, element: &ElementRef, offset: usize) -> Result<Point, DomError> {
        let state = self.state.lock();
        let node = state.node(element.as_str()).ok_or_else(|| DomError::UnknownElement {
            element: element.clone(),
        })?;
        let bounds = state.viewport_bounds(node);
        let before: String = node.element.value.chars().take(offset).collect();
        let line = before.matches('\n').count();
        let column = before.rsplit('\n').next().map_or(0, |tail| tail.chars().count());
        let x = (bounds.x + TEXT_INSET + column as f64 * CHAR_WIDTH).min(bounds.x + bounds.width);
        let y = (bounds.y + LINE_HEIGHT / 2.0 + line as f64 * LINE_HEIGHT).min(bounds.y + bounds.height);
        Ok(Point::new(x, y))
    }

    async fn scroll_position(&self, element: &ElementRef) -> Result<Point, DomError> {
        let state = self.state.lock();
        state
            .node(element.as_str())
            .map(|node| node.scroll)
            .ok_or_else(|| DomError::UnknownElement {
                element: element.clone(),
            })
    }

    async fn scroll_extent(&self, element: &ElementRef) -> Result<Point, DomError> {
        let state = self.state.lock();
        state
            .node(element.as_str())
            .map(|node| node.element.scroll_extent)
            .ok_or_else(|| DomError::UnknownElement {
                element: element.clone(),
            })
    }

    async fn viewport(&self) -> Result<Rect, DomError> {
        Ok(self.state.lock().viewport)
    }
}

#[async_trait]
impl InputPort for MemoryPage {
    async fn dispatch(&self, event: &InputEvent) -> Result<(), DomError> {
        let mut state = self.state.lock();
        match state.node(event.target.as_str()) {
            None => {
                return Err(DomError::UnknownElement {
                    element: event.target.clone(),
                })
            }
            Some(node) if !node.attached => {
                return Err(DomError::Detached {
                    element: event.target.clone(),
                })
            }
            Some(_) => {}
        }
        trace!(event = event.event_type.name(), target = %event.target, "memory page event");
        state.apply(event);
        state.log.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> MemoryPage {
        MemoryPage::with_elements(
            800.0,
            600.0,
            vec![
                PageElement::new("form", "form", Rect::new(0.0, 0.0, 400.0, 300.0)),
                PageElement::new("name", "input", Rect::new(10.0, 10.0, 200.0, 20.0))
                    .editable()
                    .with_class("field")
                    .with_parent("form"),
                PageElement::new("cover", "div", Rect::new(0.0, 0.0, 50.0, 50.0)).with_z_index(5),
            ],
        )
    }

    #[tokio::test]
    async fn compound_and_descendant_selectors() {
        let page = page();
        let by_class = page.query(&Selector::new("form input.field"), &[]).await.unwrap();
        assert_eq!(by_class.len(), 1);
        assert_eq!(by_class[0].element.as_str(), "name");
        assert!(page.query(&Selector::new("#cover input"), &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn hit_test_respects_z_order() {
        let page = page();
        let top = page.element_from_point(Point::new(20.0, 20.0)).await.unwrap();
        assert_eq!(top, Some(ElementRef::new("cover")));
        let top = page.element_from_point(Point::new(150.0, 20.0)).await.unwrap();
        assert_eq!(top, Some(ElementRef::new("name")));
        assert!(page.element_from_point(Point::new(900.0, 20.0)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn detach_on_resolve_fires_once() {
        let page = page();
        page.detach_on_resolve("name");
        let found = page.query(&Selector::new("#name"), &[]).await.unwrap();
        assert!(found[0].attached);
        let snapshot = page
            .snapshot(&ElementRef::new("name"), &[])
            .await
            .unwrap()
            .unwrap();
        assert!(!snapshot.attached);
        assert!(page.query(&Selector::new("#name"), &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn input_inserts_at_caret_and_backspace_deletes() {
        let page = page();
        let name = ElementRef::new("name");
        for text in ["a", "b"] {
            page.dispatch(&InputEvent {
                event_type: InputEventType::Input,
                target: name.clone(),
                options: crate::ports::EventOptions {
                    text: Some(text.into()),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        }
        page.dispatch(&InputEvent {
            event_type: InputEventType::KeyDown,
            target: name.clone(),
            options: crate::ports::EventOptions {
                key: Some("Backspace".into()),
                ..Default::default()
            },
        })
        .await
        .unwrap();
        assert_eq!(page.value("name").as_deref(), Some("a"));
        assert_eq!(page.event_log(), vec!["input@name", "input@name", "keydown@name"]);
    }

    #[tokio::test]
    async fn property_fetch_failure_is_reported() {
        let page = page();
        page.fail_property("value");
        let err = page
            .query(&Selector::new("#name"), &["value".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, DomError::PropertyFetch { .. }));
    }
}
