//! Action automations
//!
//! One automation instance per executed command. An instance resolves its
//! targets, optionally re-validates them right before dispatch, drives the
//! browsing context's cursor and emits the ordered input steps for its
//! action kind, either locally through the page ports or through a native
//! dispatch backend.

pub mod actions;
mod dispatch;
pub mod instance;
pub mod keys;
pub mod memory_page;
pub mod model;
pub mod policy;
pub mod ports;
pub mod resolve;

pub use actions::{build, selector_properties};
pub use dispatch::{AutomationDeps, MAX_WHEEL_STEPS};
pub use instance::{Automation, AutomationInstance, UnsupportedAutomation};
pub use keys::{parse_key_sequence, KeyCombo, KeyParseError};
pub use memory_page::{MemoryPage, PageElement, DOCUMENT_ID};
pub use model::{AutomationOutcome, AutomationState, StateProbe};
pub use policy::{AutomationPolicy, MIN_SPEED};
pub use ports::{
    DomError, DomPort, ElementSnapshot, EventOptions, InputEvent, InputEventType, InputPort,
    NativeDispatch, NativeDispatchError, PagePorts, SelectionRange, SelectorPort,
};
pub use resolve::resolve_target;
