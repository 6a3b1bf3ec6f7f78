//! Key-combination parsing for `pressKey`.
//!
//! A sequence is whitespace separated combinations, each combination is
//! `+` separated parts: `"ctrl+a delete"`, `"shift+tab enter"`.

use command_protocol::KeyMod;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("key sequence is empty")]
    Empty,
    #[error("combination `{0}` has an empty part")]
    EmptyPart(String),
    #[error("unknown key `{0}`")]
    UnknownKey(String),
    #[error("combination `{0}` names more than one non-modifier key")]
    MultipleKeys(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyCombo {
    pub modifiers: KeyMod,
    /// Canonical key name (`"a"`, `"Enter"`, `"ArrowLeft"`). `None` for a
    /// modifier-only combination such as `"shift"`.
    pub key: Option<String>,
}

impl KeyCombo {
    /// Modifier key names in press order.
    pub fn modifier_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        for (flag, name) in MODIFIER_ORDER {
            if self.modifiers.contains(flag) {
                keys.push(name);
            }
        }
        keys
    }

    /// Text the combination inserts, if any. Shortcuts never insert text.
    pub fn text(&self) -> Option<String> {
        if self
            .modifiers
            .intersects(KeyMod::CTRL | KeyMod::ALT | KeyMod::META)
        {
            return None;
        }
        let key = self.key.as_deref()?;
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if self.modifiers.contains(KeyMod::SHIFT) => {
                Some(ch.to_uppercase().collect())
            }
            (Some(_), None) => Some(key.to_string()),
            _ => None,
        }
    }
}

const MODIFIER_ORDER: [(KeyMod, &str); 4] = [
    (KeyMod::CTRL, "Control"),
    (KeyMod::SHIFT, "Shift"),
    (KeyMod::ALT, "Alt"),
    (KeyMod::META, "Meta"),
];

fn modifier(part: &str) -> Option<KeyMod> {
    match part {
        "ctrl" | "control" => Some(KeyMod::CTRL),
        "shift" => Some(KeyMod::SHIFT),
        "alt" | "option" => Some(KeyMod::ALT),
        "meta" | "cmd" | "command" => Some(KeyMod::META),
        _ => None,
    }
}

fn named_key(part: &str) -> Option<&'static str> {
    let key = match part {
        "enter" | "return" => "Enter",
        "tab" => "Tab",
        "space" => " ",
        "backspace" => "Backspace",
        "delete" | "del" => "Delete",
        "esc" | "escape" => "Escape",
        "left" => "ArrowLeft",
        "right" => "ArrowRight",
        "up" => "ArrowUp",
        "down" => "ArrowDown",
        "home" => "Home",
        "end" => "End",
        "pageup" => "PageUp",
        "pagedown" => "PageDown",
        "ins" | "insert" => "Insert",
        "plus" => "+",
        "capslock" => "CapsLock",
        _ => return None,
    };
    Some(key)
}

fn parse_combo(raw: &str) -> Result<KeyCombo, KeyParseError> {
    let mut combo = KeyCombo {
        modifiers: KeyMod::empty(),
        key: None,
    };
    for part in raw.split('+') {
        if part.is_empty() {
            return Err(KeyParseError::EmptyPart(raw.to_string()));
        }
        let lower = part.to_ascii_lowercase();
        if let Some(flag) = modifier(&lower) {
            combo.modifiers |= flag;
            continue;
        }
        let key = if part.chars().count() == 1 {
            part.to_string()
        } else if let Some(name) = named_key(&lower) {
            name.to_string()
        } else if lower.len() > 1 && lower.starts_with('f') && lower[1..].parse::<u8>().is_ok() {
            lower.to_ascii_uppercase()
        } else {
            return Err(KeyParseError::UnknownKey(part.to_string()));
        };
        if combo.key.replace(key).is_some() {
            return Err(KeyParseError::MultipleKeys(raw.to_string()));
        }
    }
    Ok(combo)
}

pub fn parse_key_sequence(raw: &str) -> Result<Vec<KeyCombo>, KeyParseError> {
    let combos = raw
        .split_whitespace()
        .map(parse_combo)
        .collect::<Result<Vec<_>, _>>()?;
    if combos.is_empty() {
        return Err(KeyParseError::Empty);
    }
    Ok(combos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shortcuts_and_named_keys() {
        let combos = parse_key_sequence("ctrl+a  Delete shift+tab").unwrap();
        assert_eq!(combos.len(), 3);
        assert_eq!(combos[0].modifiers, KeyMod::CTRL);
        assert_eq!(combos[0].key.as_deref(), Some("a"));
        assert_eq!(combos[0].text(), None);
        assert_eq!(combos[1].key.as_deref(), Some("Delete"));
        assert_eq!(combos[2].modifier_keys(), vec!["Shift"]);
        assert_eq!(combos[2].key.as_deref(), Some("Tab"));
    }

    #[test]
    fn printable_keys_insert_text() {
        let combos = parse_key_sequence("x shift+y space").unwrap();
        let text: Vec<_> = combos.iter().map(KeyCombo::text).collect();
        assert_eq!(
            text,
            vec![Some("x".into()), Some("Y".into()), Some(" ".into())]
        );
    }

    #[test]
    fn rejects_malformed_sequences() {
        assert_eq!(parse_key_sequence("   "), Err(KeyParseError::Empty));
        assert!(matches!(
            parse_key_sequence("ctrl++"),
            Err(KeyParseError::EmptyPart(_))
        ));
        assert!(matches!(
            parse_key_sequence("hyper+a"),
            Err(KeyParseError::UnknownKey(_))
        ));
        assert!(matches!(
            parse_key_sequence("a+b"),
            Err(KeyParseError::MultipleKeys(_))
        ));
        assert_eq!(
            parse_key_sequence("f5").unwrap()[0].key.as_deref(),
            Some("F5")
        );
    }
}
