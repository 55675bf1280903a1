use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::message::Message;
use crate::value_objects::{RoomId, Timestamp, UserId};

/// 房间 ID 中连接两个参与者 ID 的分隔符。
pub const ROOM_ID_SEPARATOR: char = '_';

impl RoomId {
    /// 由参与者集合推导房间 ID：先排序再拼接，与调用方传入顺序无关。
    ///
    /// 只支持一对一房间，参与者必须恰好是两个不同的用户，
    /// 且 ID 中不能含有分隔符，否则不同的参与者对可能拼出相同的房间 ID。
    pub fn for_participants(participants: &[UserId]) -> Result<(RoomId, [UserId; 2]), DomainError> {
        let [a, b] = participants else {
            return Err(DomainError::invalid_participants(format!(
                "expected exactly 2 participants, got {}",
                participants.len()
            )));
        };
        a.check()?;
        b.check()?;
        if a == b {
            return Err(DomainError::invalid_participants(
                "participants must be distinct",
            ));
        }
        if let Some(bad) = [a, b]
            .into_iter()
            .find(|id| id.as_str().contains(ROOM_ID_SEPARATOR))
        {
            return Err(DomainError::invalid_participants(format!(
                "participant id {bad} contains the room id separator"
            )));
        }

        let mut sorted = [a.clone(), b.clone()];
        sorted.sort();
        let id = RoomId::from(format!(
            "{}{}{}",
            sorted[0], ROOM_ID_SEPARATOR, sorted[1]
        ));
        Ok((id, sorted))
    }

    /// 从房间 ID 还原参与者；只接受 `for_participants` 能生成的规范形式。
    pub fn participants(&self) -> Result<[UserId; 2], DomainError> {
        let Some((a, b)) = self.as_str().split_once(ROOM_ID_SEPARATOR) else {
            return Err(DomainError::invalid_participants(format!(
                "room id {self} does not name two participants"
            )));
        };
        let (canonical, members) =
            RoomId::for_participants(&[UserId::from(a), UserId::from(b)])?;
        if canonical != *self {
            return Err(DomainError::invalid_participants(format!(
                "room id {self} is not in canonical form"
            )));
        }
        Ok(members)
    }
}

/// 一对一聊天室元数据。`last_message` 和 `last_message_time` 只是列表视图的冗余摘要。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: RoomId,
    pub participants: Vec<UserId>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub last_message: Option<Message>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_message_time: Option<Timestamp>,
    #[serde(default)]
    pub unread_count: BTreeMap<UserId, u32>,
}

impl ChatRoom {
    pub fn includes(&self, user_id: &UserId) -> bool {
        self.participants.contains(user_id)
    }

    /// 除 `user_id` 之外的参与者。
    pub fn others<'a>(&'a self, user_id: &'a UserId) -> impl Iterator<Item = &'a UserId> + 'a {
        self.participants.iter().filter(move |p| *p != user_id)
    }

    pub fn unread_for(&self, user_id: &UserId) -> u32 {
        self.unread_count.get(user_id).copied().unwrap_or(0)
    }
}

/// 房间列表排序：最近有消息的在前。
pub fn sort_rooms_by_activity(rooms: &mut [ChatRoom]) {
    rooms.sort_by(|a, b| {
        b.last_message_time
            .cmp(&a.last_message_time)
            .then_with(|| a.id.cmp(&b.id))
    });
}
