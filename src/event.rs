//! Normalization of raw Telegram update payloads.
//!
//! The webhook body is kept as an untyped `serde_json::Value`; classification
//! looks for known content keys in a fixed priority order and extracts only
//! the fields each kind needs. Missing or mistyped fields degrade to defaults.

use serde_json::Value;
use tracing::warn;

/// Content kind of an inbound message. Also the `message_type` stored in the
/// audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Voice,
    Photo,
    Video,
    VideoNote,
    Animation,
    Document,
    Sticker,
    Poll,
    Venue,
    Location,
    Audio,
    Unknown,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Voice => "voice",
            MessageKind::Photo => "photo",
            MessageKind::Video => "video",
            MessageKind::VideoNote => "video_note",
            MessageKind::Animation => "animation",
            MessageKind::Document => "document",
            MessageKind::Sticker => "sticker",
            MessageKind::Poll => "poll",
            MessageKind::Venue => "venue",
            MessageKind::Location => "location",
            MessageKind::Audio => "audio",
            MessageKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized inbound event. Exactly one variant per message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Text { body: String },
    Voice { file_id: String },
    Photo { file_id: String },
    Video { file_id: String },
    VideoNote { file_id: String },
    Animation { file_id: String, file_name: String },
    Document { file_id: String, file_name: String },
    /// `emoji` is `None` when the sticker carries no emoji.
    Sticker { emoji: Option<String> },
    Poll { question: String },
    Venue { title: String, address: String },
    Location { lat: f64, lon: f64 },
    Audio { file_id: String },
    Unknown,
}

impl InboundEvent {
    pub fn kind(&self) -> MessageKind {
        match self {
            InboundEvent::Text { .. } => MessageKind::Text,
            InboundEvent::Voice { .. } => MessageKind::Voice,
            InboundEvent::Photo { .. } => MessageKind::Photo,
            InboundEvent::Video { .. } => MessageKind::Video,
            InboundEvent::VideoNote { .. } => MessageKind::VideoNote,
            InboundEvent::Animation { .. } => MessageKind::Animation,
            InboundEvent::Document { .. } => MessageKind::Document,
            InboundEvent::Sticker { .. } => MessageKind::Sticker,
            InboundEvent::Poll { .. } => MessageKind::Poll,
            InboundEvent::Venue { .. } => MessageKind::Venue,
            InboundEvent::Location { .. } => MessageKind::Location,
            InboundEvent::Audio { .. } => MessageKind::Audio,
            InboundEvent::Unknown => MessageKind::Unknown,
        }
    }
}

/// Who sent the message, taken from `message.chat`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatIdentity {
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ChatIdentity {
    pub fn from_message(message: &Value) -> Self {
        let chat = &message["chat"];
        let chat_id = match chat["id"].as_i64() {
            Some(id) => id,
            None => {
                warn!("Message has no integer chat.id, defaulting to 0");
                0
            }
        };

        Self {
            chat_id,
            username: opt_str(chat, "username"),
            first_name: opt_str(chat, "first_name"),
            last_name: opt_str(chat, "last_name"),
        }
    }
}

/// Content keys in the order they are tested.
const PRIORITY: [&str; 12] = [
    "voice",
    "text",
    "sticker",
    "video_note",
    "animation",
    "photo",
    "video",
    "audio",
    "document",
    "poll",
    "venue",
    "location",
];

/// Classify a Telegram `message` object. Total: any value, including a
/// non-object, yields exactly one variant.
pub fn classify(message: &Value) -> InboundEvent {
    let Some(fields) = message.as_object() else {
        return InboundEvent::Unknown;
    };

    let Some(key) = PRIORITY.iter().find(|k| fields.contains_key(**k)) else {
        return InboundEvent::Unknown;
    };
    let content = &fields[*key];

    match *key {
        "voice" => InboundEvent::Voice {
            file_id: str_or_default(content, "file_id"),
        },
        "text" => InboundEvent::Text {
            body: content.as_str().unwrap_or_default().to_string(),
        },
        "sticker" => InboundEvent::Sticker {
            emoji: opt_str(content, "emoji"),
        },
        "video_note" => InboundEvent::VideoNote {
            file_id: str_or_default(content, "file_id"),
        },
        "animation" => InboundEvent::Animation {
            file_id: str_or_default(content, "file_id"),
            file_name: opt_str(content, "file_name").unwrap_or_else(|| "animation.gif".to_string()),
        },
        // Telegram lists photo sizes smallest first
        "photo" => InboundEvent::Photo {
            file_id: content
                .as_array()
                .and_then(|sizes| sizes.last())
                .map(|largest| str_or_default(largest, "file_id"))
                .unwrap_or_default(),
        },
        "video" => InboundEvent::Video {
            file_id: str_or_default(content, "file_id"),
        },
        "audio" => InboundEvent::Audio {
            file_id: str_or_default(content, "file_id"),
        },
        "document" => InboundEvent::Document {
            file_id: str_or_default(content, "file_id"),
            file_name: opt_str(content, "file_name")
                .unwrap_or_else(|| "Unknown Document".to_string()),
        },
        "poll" => InboundEvent::Poll {
            question: str_or_default(content, "question"),
        },
        "venue" => InboundEvent::Venue {
            title: str_or_default(content, "title"),
            address: str_or_default(content, "address"),
        },
        "location" => InboundEvent::Location {
            lat: content["latitude"].as_f64().unwrap_or_default(),
            lon: content["longitude"].as_f64().unwrap_or_default(),
        },
        _ => InboundEvent::Unknown,
    }
}

fn opt_str(value: &Value, key: &str) -> Option<String> {
    value[key].as_str().map(str::to_string)
}

fn str_or_default(value: &Value, key: &str) -> String {
    opt_str(value, key).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_and_non_object_are_unknown() {
        assert_eq!(classify(&json!({})), InboundEvent::Unknown);
        assert_eq!(classify(&json!(null)), InboundEvent::Unknown);
        assert_eq!(classify(&json!("text")), InboundEvent::Unknown);
        assert_eq!(classify(&json!({"chat": {"id": 1}})), InboundEvent::Unknown);
    }

    #[test]
    fn test_voice_wins_over_text() {
        let message = json!({
            "text": "hello",
            "voice": {"file_id": "AwACAgQ"},
        });
        assert_eq!(
            classify(&message),
            InboundEvent::Voice {
                file_id: "AwACAgQ".to_string()
            }
        );
    }

    #[test]
    fn test_animation_wins_over_document() {
        // Telegram sends both keys for GIFs
        let message = json!({
            "animation": {"file_id": "anim", "file_name": "dance.mp4"},
            "document": {"file_id": "anim", "file_name": "dance.mp4"},
        });
        assert_eq!(classify(&message).kind(), MessageKind::Animation);
    }

    #[test]
    fn test_text_without_string_defaults_to_empty() {
        let message = json!({"text": 42});
        assert_eq!(
            classify(&message),
            InboundEvent::Text {
                body: String::new()
            }
        );
    }

    #[test]
    fn test_photo_takes_largest_size() {
        let message = json!({
            "photo": [
                {"file_id": "small", "width": 90},
                {"file_id": "medium", "width": 320},
                {"file_id": "large", "width": 1280},
            ]
        });
        assert_eq!(
            classify(&message),
            InboundEvent::Photo {
                file_id: "large".to_string()
            }
        );
        assert_eq!(
            classify(&json!({"photo": []})),
            InboundEvent::Photo {
                file_id: String::new()
            }
        );
    }

    #[test]
    fn test_field_defaults() {
        assert_eq!(
            classify(&json!({"animation": {"file_id": "a"}})),
            InboundEvent::Animation {
                file_id: "a".to_string(),
                file_name: "animation.gif".to_string()
            }
        );
        assert_eq!(
            classify(&json!({"document": {"file_id": "d"}})),
            InboundEvent::Document {
                file_id: "d".to_string(),
                file_name: "Unknown Document".to_string()
            }
        );
        assert_eq!(
            classify(&json!({"sticker": {"file_id": "s"}})),
            InboundEvent::Sticker { emoji: None }
        );
        assert_eq!(
            classify(&json!({"venue": {"title": "Cafe"}})),
            InboundEvent::Venue {
                title: "Cafe".to_string(),
                address: String::new()
            }
        );
    }

    #[test]
    fn test_location() {
        let message = json!({"location": {"latitude": 52.52, "longitude": 13.405}});
        assert_eq!(
            classify(&message),
            InboundEvent::Location {
                lat: 52.52,
                lon: 13.405
            }
        );
    }

    #[test]
    fn test_each_kind_maps_to_its_tag() {
        let cases = [
            (json!({"voice": {}}), "voice"),
            (json!({"text": "hi"}), "text"),
            (json!({"sticker": {}}), "sticker"),
            (json!({"video_note": {}}), "video_note"),
            (json!({"animation": {}}), "animation"),
            (json!({"photo": []}), "photo"),
            (json!({"video": {}}), "video"),
            (json!({"audio": {}}), "audio"),
            (json!({"document": {}}), "document"),
            (json!({"poll": {}}), "poll"),
            (json!({"venue": {}}), "venue"),
            (json!({"location": {}}), "location"),
            (json!({"contact": {}}), "unknown"),
        ];
        for (message, tag) in cases {
            assert_eq!(classify(&message).kind().as_str(), tag, "{message}");
        }
    }

    #[test]
    fn test_classify_is_repeatable() {
        let message = json!({"venue": {"title": "Museum", "address": "Main St 1"}});
        assert_eq!(classify(&message), classify(&message));
    }

    #[test]
    fn test_identity_extraction() {
        let message = json!({
            "chat": {"id": 123456789, "username": "alice", "first_name": "Alice"}
        });
        let identity = ChatIdentity::from_message(&message);
        assert_eq!(identity.chat_id, 123456789);
        assert_eq!(identity.username.as_deref(), Some("alice"));
        assert_eq!(identity.first_name.as_deref(), Some("Alice"));
        assert_eq!(identity.last_name, None);
    }

    #[test]
    fn test_identity_without_chat_defaults() {
        let identity = ChatIdentity::from_message(&json!({"text": "hi"}));
        assert_eq!(identity, ChatIdentity::default());
    }
}
