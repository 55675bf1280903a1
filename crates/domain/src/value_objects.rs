use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// 统一的时间戳类型，线上格式为毫秒级 Unix 时间。
pub type Timestamp = DateTime<Utc>;

/// 把毫秒时间戳转换为 `Timestamp`，超出范围时返回 `None`。
pub fn timestamp_from_millis(millis: i64) -> Option<Timestamp> {
    Utc.timestamp_millis_opt(millis).single()
}

/// 存储键中禁止出现的字符。
const FORBIDDEN_KEY_CHARS: [char; 6] = ['.', '#', '$', '[', ']', '/'];

fn validate_key(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::invalid_argument(field, "cannot be empty"));
    }
    if value.len() > 768 {
        return Err(DomainError::invalid_argument(field, "too long"));
    }
    if value
        .chars()
        .any(|c| c.is_control() || FORBIDDEN_KEY_CHARS.contains(&c))
    {
        return Err(DomainError::invalid_argument(
            field,
            "contains characters not allowed in a store key",
        ));
    }
    Ok(())
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// 校验外部输入并构造标识。
            pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                validate_key($field, &value)?;
                Ok(Self(value))
            }

            /// 用作存储路径的一段之前的校验：空串、`/` 等会让路径指向上一层。
            pub fn check(&self) -> Result<(), DomainError> {
                validate_key($field, &self.0)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        // 来自存储键的可信数据，不再重复校验
        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// 用户唯一标识。
    UserId,
    "user_id"
);
string_id!(
    /// 聊天室唯一标识，由参与者集合推导。
    RoomId,
    "room_id"
);
string_id!(
    /// 消息唯一标识（推送键），按创建顺序字典序递增。
    MessageId,
    "message_id"
);
string_id!(
    /// 好友请求唯一标识。
    RequestId,
    "request_id"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_path_characters() {
        assert!(UserId::parse("u1").is_ok());
        assert!(UserId::parse("").is_err());
        assert!(UserId::parse("users/u1").is_err());
        assert!(UserId::parse("a.b").is_err());
        assert!(RoomId::parse("u1_u2").is_ok());
    }

    #[test]
    fn check_reports_the_field() {
        assert!(MessageId::from("-Nabc").check().is_ok());
        let err = MessageId::from("").check().unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument { ref field, .. } if field == "message_id"));
        assert!(UserId::from("u1/friends").check().is_err());
        assert!(RequestId::from("  ").check().is_err());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = MessageId::from("-Nabc");
        assert_eq!(serde_json::to_value(&id).unwrap(), serde_json::json!("-Nabc"));
    }

    #[test]
    fn millis_round_trip() {
        let ts = timestamp_from_millis(1_700_000_000_123).unwrap();
        assert_eq!(ts.timestamp_millis(), 1_700_000_000_123);
    }
}
