//! 存储记录与领域对象之间的转换
//!
//! 用户、好友边和聊天室的 ID 来自存储键，而不是记录内容；
//! 其余记录（请求、消息、在线状态）直接按线上格式反序列化。

use std::collections::BTreeMap;

use domain::{timestamp_from_millis, ChatRoom, Friend, Message, RoomId, Timestamp, User, UserId};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApplicationError, StoreError};
use crate::store::StorePath;

fn epoch() -> Timestamp {
    Timestamp::default()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn encode<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}

/// 点读得到的记录无法解析时报告为 `InvalidRecord`。
pub fn decode<T: DeserializeOwned>(path: &StorePath, value: Value) -> Result<T, ApplicationError> {
    serde_json::from_value(value).map_err(|err| ApplicationError::invalid_record(path, err))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    bio: Option<String>,
}

pub fn decode_user(key: &str, value: Value) -> Result<User, serde_json::Error> {
    let record: UserRecord = serde_json::from_value(value)?;
    Ok(User {
        id: UserId::from(key),
        name: record.name,
        email: record.email,
        avatar: non_empty(record.avatar),
        bio: non_empty(record.bio),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FriendRecord {
    #[serde(default)]
    name: String,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    added_at: Option<i64>,
    #[serde(default)]
    is_online: Option<bool>,
}

pub fn decode_friend(key: &str, value: Value) -> Result<Friend, serde_json::Error> {
    let record: FriendRecord = serde_json::from_value(value)?;
    Ok(Friend {
        id: UserId::from(key),
        name: record.name,
        avatar: non_empty(record.avatar),
        added_at: record
            .added_at
            .and_then(timestamp_from_millis)
            .unwrap_or_else(epoch),
        is_online: record.is_online,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRoomRecord {
    #[serde(default)]
    participants: Vec<UserId>,
    #[serde(default)]
    created_at: Option<i64>,
    #[serde(default)]
    last_message: Option<Value>,
    #[serde(default)]
    last_message_time: Option<i64>,
    #[serde(default)]
    unread_count: BTreeMap<String, Value>,
}

/// 房间记录中损坏的摘要和计数会被忽略，只有参与者列表是必需的。
pub fn decode_chat_room(key: &str, value: Value) -> Result<ChatRoom, serde_json::Error> {
    let record: ChatRoomRecord = serde_json::from_value(value)?;
    let unread_count = record
        .unread_count
        .into_iter()
        .filter_map(|(user, count)| {
            let count = count.as_i64()?.clamp(0, i64::from(u32::MAX));
            Some((UserId::from(user), count as u32))
        })
        .collect();

    Ok(ChatRoom {
        id: RoomId::from(key),
        participants: record.participants,
        created_at: record.created_at.and_then(timestamp_from_millis),
        last_message: record
            .last_message
            .and_then(|v| serde_json::from_value::<Message>(v).ok()),
        last_message_time: record.last_message_time.and_then(timestamp_from_millis),
        unread_count,
    })
}

/// 消息窗口里的单条记录：空值（已删除）、缺少 ID 或格式不对都返回 `None`。
pub fn decode_message(key: &str, value: Value) -> Option<Message> {
    if value.is_null() {
        tracing::debug!(key, "跳过已删除的消息");
        return None;
    }
    match serde_json::from_value::<Message>(value) {
        Ok(message) if !message.id.as_str().trim().is_empty() => Some(message),
        Ok(_) => {
            tracing::debug!(key, "跳过缺少 ID 的消息");
            None
        }
        Err(err) => {
            tracing::debug!(key, error = %err, "跳过无效消息");
            None
        }
    }
}
