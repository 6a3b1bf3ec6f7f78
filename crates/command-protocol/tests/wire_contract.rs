use command_protocol::{ActionCommand, CommandMessage, CommandType, ElementTarget, KeyMod};
use serde_json::json;

#[test]
fn orchestrator_message_decodes_on_agent_side() {
    let raw = json!({
        "type": "type-text",
        "target": { "by": "selector", "value": "#name" },
        "text": "ab",
        "replace": true,
        "speed": 0.5,
        "modifiers": "SHIFT"
    });

    let message: CommandMessage = serde_json::from_value(raw).unwrap();
    let command = message.decode().unwrap();
    assert_eq!(command.kind, CommandType::TypeText);
    assert_eq!(command.target, Some(ElementTarget::css("#name")));
    assert_eq!(command.options.text.as_deref(), Some("ab"));
    assert!(command.options.replace);
    assert_eq!(command.options.speed, Some(0.5));
    assert_eq!(command.options.modifiers, KeyMod::SHIFT);
}

#[test]
fn every_identifier_survives_the_envelope() {
    for kind in CommandType::ALL {
        let message = CommandMessage::from_command(&ActionCommand::new(*kind)).unwrap();
        assert_eq!(message.type_id, kind.wire_id());
        assert_eq!(message.decode().unwrap().kind, *kind);
    }
}
