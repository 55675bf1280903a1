use serde::{Deserialize, Serialize};

use crate::value_objects::{MessageId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// 按消息类型区分的附加内容，线上格式为 `type` 字段加上对应字段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessagePayload {
    Text,
    Image {
        #[serde(rename = "imageUrl")]
        image_url: String,
    },
    Location {
        location: GeoPoint,
    },
}

/// 房间消息。只追加，ID 在创建时分配且永不复用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    #[serde(default)]
    pub text: String,
    pub sender_id: UserId,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_avatar: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub payload: MessagePayload,
}

impl Message {
    /// 展示顺序：时间戳优先，相同时按创建 ID 递增。
    pub fn ordering_key(&self) -> (Timestamp, &MessageId) {
        (self.timestamp, &self.id)
    }

    pub fn text_contains(&self, needle: &str) -> bool {
        !self.text.is_empty() && self.text.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// 调用方提交的待发送消息，发送者信息和时间戳由服务填充。
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    pub text: String,
    pub payload: MessagePayload,
}

impl MessageDraft {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            payload: MessagePayload::Text,
        }
    }

    pub fn image(image_url: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            text: caption.into(),
            payload: MessagePayload::Image {
                image_url: image_url.into(),
            },
        }
    }

    pub fn location(location: GeoPoint, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            payload: MessagePayload::Location { location },
        }
    }
}

pub fn sort_messages(messages: &mut [Message]) {
    messages.sort_by(|a, b| a.ordering_key().cmp(&b.ordering_key()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::timestamp_from_millis;
    use serde_json::json;

    fn message(id: &str, millis: i64) -> Message {
        Message {
            id: MessageId::from(id),
            text: "hi".into(),
            sender_id: UserId::from("u1"),
            sender_name: "Ann".into(),
            sender_avatar: None,
            timestamp: timestamp_from_millis(millis).unwrap(),
            payload: MessagePayload::Text,
        }
    }

    #[test]
    fn sorts_by_timestamp_then_id() {
        let mut messages = vec![message("b", 20), message("c", 10), message("a", 20)];
        sort_messages(&mut messages);
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn wire_format_matches_store_records() {
        let mut image = message("m1", 42);
        image.payload = MessagePayload::Image {
            image_url: "https://img/1.png".into(),
        };
        let value = serde_json::to_value(&image).unwrap();
        assert_eq!(value["type"], "image");
        assert_eq!(value["imageUrl"], "https://img/1.png");
        assert_eq!(value["senderId"], "u1");
        assert_eq!(value["timestamp"], 42);

        let parsed: Message = serde_json::from_value(json!({
            "id": "m2",
            "text": "here",
            "senderId": "u2",
            "senderName": "Bob",
            "timestamp": 7,
            "type": "location",
            "location": { "latitude": 1.5, "longitude": 2.5 }
        }))
        .unwrap();
        assert!(matches!(parsed.payload, MessagePayload::Location { .. }));
    }

    #[test]
    fn text_search_is_case_insensitive() {
        let mut m = message("m1", 1);
        m.text = "Walk the DOG".into();
        assert!(m.text_contains("dog"));
        assert!(!m.text_contains("cat"));
    }
}
