use serde::{Deserialize, Serialize};

use crate::value_objects::Timestamp;

/// 用户在线状态，每个用户一份，原地覆盖。
///
/// 离线时 `last_seen` 记录写入时刻，而不是由断线检测推导。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceStatus {
    pub is_online: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_seen: Timestamp,
}

impl PresenceStatus {
    pub fn new(is_online: bool, now: Timestamp) -> Self {
        Self {
            is_online,
            last_seen: now,
        }
    }
}
