//! Kick reason decoding and identity-conflict classification.
//!
//! Servers send kick reasons either as plain text or as a serialized chat
//! component (`{"text": ...}` or `{"extra": [{"text": ...}, ...]}`), and
//! either form may carry `§x` formatting codes. Decoding never fails: if the
//! payload is not a usable component the raw text is kept.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

/// Phrases that mean the current login name can't be used right now.
pub const CONFLICT_PHRASES: [&str; 3] = [
    "You have been idle for too long",
    "Someone with your name is already online",
    "You are banned from this server",
];

static FORMATTING_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("§.").expect("formatting-code pattern is valid"));

/// Shape of a kick payload once decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum KickPayload {
    /// Not a chat component; shown as-is.
    Raw(String),
    /// A chat component and the text it renders to.
    Component(String),
}

impl KickPayload {
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str::<ChatComponent>(raw) {
            Ok(component) => match component.render() {
                Some(text) => KickPayload::Component(text),
                None => KickPayload::Raw(raw.to_string()),
            },
            Err(_) => KickPayload::Raw(raw.to_string()),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            KickPayload::Raw(s) | KickPayload::Component(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatComponent {
    #[serde(default)]
    text: Option<serde_json::Value>,
    #[serde(default)]
    extra: Vec<serde_json::Value>,
}

impl ChatComponent {
    /// `text` if it is a non-empty string, else the concatenated `text` of
    /// each `extra` fragment, else nothing.
    fn render(&self) -> Option<String> {
        match &self.text {
            Some(serde_json::Value::String(text)) if !text.is_empty() => return Some(text.clone()),
            _ => {}
        }
        if self.extra.is_empty() {
            return None;
        }
        Some(
            self.extra
                .iter()
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect(),
        )
    }
}

/// Remove `§x` formatting codes.
pub fn strip_formatting(text: &str) -> String {
    FORMATTING_CODE.replace_all(text, "").into_owned()
}

/// A kick, decoded and classified.
#[derive(Debug, Clone, PartialEq)]
pub struct KickReason {
    /// Human-readable reason with formatting removed.
    pub text: String,
    /// True when the server rejected our identity and we should switch names.
    pub identity_conflict: bool,
}

impl KickReason {
    pub fn classify(raw: &str) -> Self {
        let text = strip_formatting(KickPayload::decode(raw).text());
        let identity_conflict = CONFLICT_PHRASES.iter().any(|phrase| text.contains(phrase));
        Self { text, identity_conflict }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_component() {
        let kick = KickReason::classify(r#"{"text":"You have been idle for too long"}"#);
        assert_eq!(kick.text, "You have been idle for too long");
        assert!(kick.identity_conflict);
    }

    #[test]
    fn extra_fragments_are_concatenated() {
        let kick = KickReason::classify(
            r#"{"extra":[{"text":"Someone "},{"text":"with your name is already online"}]}"#,
        );
        assert_eq!(kick.text, "Someone with your name is already online");
        assert!(kick.identity_conflict);
    }

    #[test]
    fn plain_text_matches_by_substring() {
        let kick = KickReason::classify("plain banned message: You are banned from this server");
        assert!(kick.identity_conflict);
    }

    #[test]
    fn formatting_is_stripped_and_unknown_reason_is_not_a_conflict() {
        let kick = KickReason::classify("§cgeneric kick");
        assert_eq!(kick.text, "generic kick");
        assert!(!kick.identity_conflict);
    }

    #[test]
    fn formatting_inside_component_is_stripped() {
        let kick = KickReason::classify(r#"{"text":"§4§lYou are banned from this server"}"#);
        assert_eq!(kick.text, "You are banned from this server");
        assert!(kick.identity_conflict);
    }

    #[test]
    fn unusable_components_fall_back_to_raw() {
        assert_eq!(
            KickPayload::decode(r#"{"text":"","extra":[]}"#),
            KickPayload::Raw(r#"{"text":"","extra":[]}"#.to_string())
        );
        assert_eq!(
            KickPayload::decode(r#"{"translate":"multiplayer.disconnect.server_shutdown"}"#),
            KickPayload::Raw(r#"{"translate":"multiplayer.disconnect.server_shutdown"}"#.to_string())
        );
        assert_eq!(KickPayload::decode("\"quoted\""), KickPayload::Raw("\"quoted\"".to_string()));
        assert_eq!(KickPayload::decode("{broken"), KickPayload::Raw("{broken".to_string()));
    }

    #[test]
    fn extra_fragments_without_text_render_empty() {
        assert_eq!(
            KickPayload::decode(r#"{"extra":[{"color":"red"},{"text":"Server restarting"}]}"#),
            KickPayload::Component("Server restarting".to_string())
        );
    }
}
