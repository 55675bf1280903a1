//! 好友关系与好友请求状态机
//!
//! 请求状态只能从 `pending` 迁移到 `accepted` 或 `rejected`，两者都是终态。
//! 好友边总是成对构造，自环在构造时即被拒绝。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{RequestId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FriendRequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for FriendRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 好友请求。发送者的名称和头像在发送时快照，不随资料变化。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub id: RequestId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub status: FriendRequestStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
    pub from_user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_user_avatar: Option<String>,
}

impl FriendRequest {
    pub fn new(
        id: RequestId,
        sender: &ProfileCard,
        to_user_id: UserId,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if sender.id == to_user_id {
            return Err(DomainError::SelfFriendship);
        }
        Ok(Self {
            id,
            from_user_id: sender.id.clone(),
            to_user_id,
            status: FriendRequestStatus::Pending,
            timestamp: now,
            from_user_name: sender.name.clone(),
            from_user_avatar: sender.avatar.clone(),
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == FriendRequestStatus::Pending
    }

    pub fn is_pending_between(&self, from: &UserId, to: &UserId) -> bool {
        self.is_pending() && &self.from_user_id == from && &self.to_user_id == to
    }

    /// 状态迁移：只有接收者可以处理，且只能处理一次。
    pub fn resolve(
        &mut self,
        actor: &UserId,
        outcome: FriendRequestStatus,
    ) -> Result<(), DomainError> {
        if actor != &self.to_user_id {
            return Err(DomainError::NotRequestRecipient);
        }
        if self.status.is_terminal() {
            return Err(DomainError::RequestAlreadyResolved {
                status: self.status.to_string(),
            });
        }
        if outcome == FriendRequestStatus::Pending {
            return Err(DomainError::invalid_argument(
                "status",
                "a request can only be resolved to accepted or rejected",
            ));
        }
        self.status = outcome;
        Ok(())
    }
}

/// 建立好友边时使用的显示信息快照。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCard {
    pub id: UserId,
    pub name: String,
    pub avatar: Option<String>,
}

/// 存放在某个用户名下的一条好友边，`id` 是对方的用户 ID。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub added_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_online: Option<bool>,
}

/// 一对对称的好友边。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendLink {
    /// 写在 `a` 名下、指向 `b` 的边
    pub for_a: (UserId, Friend),
    /// 写在 `b` 名下、指向 `a` 的边
    pub for_b: (UserId, Friend),
}

impl FriendLink {
    pub fn into_edges(self) -> [(UserId, Friend); 2] {
        [self.for_a, self.for_b]
    }
}

impl Friend {
    fn from_card(card: &ProfileCard, at: Timestamp) -> Self {
        Self {
            id: card.id.clone(),
            name: card.name.clone(),
            avatar: card.avatar.clone(),
            added_at: at,
            is_online: None,
        }
    }

    /// 唯一的好友边构造入口：总是同时生成两个方向，拒绝自环。
    pub fn link(a: &ProfileCard, b: &ProfileCard, at: Timestamp) -> Result<FriendLink, DomainError> {
        if a.id == b.id {
            return Err(DomainError::SelfFriendship);
        }
        Ok(FriendLink {
            for_a: (a.id.clone(), Self::from_card(b, at)),
            for_b: (b.id.clone(), Self::from_card(a, at)),
        })
    }
}

/// 好友列表排序：按显示名称（忽略大小写），再按原始名称和 ID 保证稳定。
pub fn sort_friends(friends: &mut [Friend]) {
    friends.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
}
