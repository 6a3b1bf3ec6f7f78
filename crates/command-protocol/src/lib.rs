//! Shared command-identifier protocol.
//!
//! The table carries no logic, only naming: the orchestrator uses it to
//! serialize a requested action and the in-page agent uses it to pick a
//! handler. Both sides must agree on every identifier byte-for-byte.

pub mod command;
pub mod message;
pub mod table;

pub use command::{ActionCommand, ActionOptions, ElementTarget, KeyMod, ScrollPosition, Selector};
pub use message::{CommandMessage, MessageError};
pub use table::CommandType;
