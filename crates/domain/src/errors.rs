//! 领域模型错误定义
//!
//! 只描述不变量被破坏的情况，不涉及存储或网络。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 不能与自己建立好友关系
    #[error("不能添加自己为好友")]
    SelfFriendship,

    /// 聊天室参与者不合法（必须恰好两个不同用户）
    #[error("聊天室参与者不合法: {reason}")]
    InvalidParticipants { reason: String },

    /// 只有请求的接收者可以处理好友请求
    #[error("无权操作此请求")]
    NotRequestRecipient,

    /// 好友请求已经处于终态
    #[error("好友请求已处理: {status}")]
    RequestAlreadyResolved { status: String },

    /// 参数校验失败
    #[error("参数不合法: {field}: {reason}")]
    InvalidArgument { field: String, reason: String },
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_participants(reason: impl Into<String>) -> Self {
        Self::InvalidParticipants {
            reason: reason.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
