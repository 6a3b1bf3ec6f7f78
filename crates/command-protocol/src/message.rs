//! Orchestrator-to-agent envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::command::ActionCommand;
use crate::table::CommandType;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("unknown command identifier `{0}`")]
    UnknownIdentifier(String),
    #[error("malformed `{command}` message: {source}")]
    Malformed {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw message as received across the process boundary. The identifier is
/// kept as an unchecked string so the receiver decides how unknown ids fail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CommandMessage {
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            fields: Map::new(),
        }
    }

    pub fn from_command(command: &ActionCommand) -> Result<Self, MessageError> {
        let value = serde_json::to_value(command).map_err(|source| MessageError::Malformed {
            command: command.kind.wire_id().to_string(),
            source,
        })?;
        serde_json::from_value(value).map_err(|source| MessageError::Malformed {
            command: command.kind.wire_id().to_string(),
            source,
        })
    }

    pub fn command_type(&self) -> Option<CommandType> {
        CommandType::from_wire_id(&self.type_id)
    }

    /// Decode the full command. Unknown identifiers fail before any field is read.
    pub fn decode(&self) -> Result<ActionCommand, MessageError> {
        if self.command_type().is_none() {
            return Err(MessageError::UnknownIdentifier(self.type_id.clone()));
        }
        let mut object = self.fields.clone();
        object.insert("type".to_string(), Value::String(self.type_id.clone()));
        serde_json::from_value(Value::Object(object)).map_err(|source| MessageError::Malformed {
            command: self.type_id.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ElementTarget;

    #[test]
    fn message_carries_wire_id_only() {
        let command = ActionCommand::drag(ElementTarget::css("#a"), 40.0, 40.0);
        let message = CommandMessage::from_command(&command).unwrap();
        assert_eq!(message.type_id, "drag");
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"dragOffsetX\":40.0"));
        assert_eq!(message.decode().unwrap(), command);
    }

    #[test]
    fn unknown_identifier_is_rejected_before_fields() {
        let mut message = CommandMessage::new("foo-bar");
        message.fields.insert("speed".into(), Value::String("nope".into()));
        assert!(matches!(
            message.decode(),
            Err(MessageError::UnknownIdentifier(id)) if id == "foo-bar"
        ));
    }

    #[test]
    fn abstract_names_are_not_identifiers() {
        let message = CommandMessage::new("typeText");
        assert!(message.command_type().is_none());
    }
}
