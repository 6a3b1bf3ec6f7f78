//! Command-to-automation dispatch.
//!
//! The registry maps each command identifier to a handler record; the
//! dispatcher runs the pre-flight pipeline for a wire message against a
//! browsing context and hands the validated command to the handler's
//! factory.

pub mod checks;
mod context;
mod dispatcher;
mod handler;
mod registry;

pub use context::BrowsingContext;
pub use dispatcher::{AutomationDispatcher, Execution};
pub use handler::{AutomationHandler, CommandCheck, CreateFn, ElementCheck};
pub use registry::{default_handler, AutomationRegistry};
