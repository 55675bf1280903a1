use domain::DomainError;
use thiserror::Error;

/// 实时键值存储的传输层错误。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("存储不可用: {0}")]
    Unavailable(String),
    #[error("存储操作超时")]
    Timeout,
    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// 对 UI 层暴露的错误分类。所有错误都不在内部重试，由调用方决定重试策略。
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("用户未登录")]
    Unauthenticated,
    #[error("已经是好友")]
    AlreadyFriends,
    #[error("已存在待处理的好友请求")]
    DuplicateRequest,
    #[error("好友请求不存在")]
    RequestNotFound,
    #[error("无权执行此操作")]
    Unauthorized,
    #[error("网络错误: {0}")]
    NetworkFailure(#[from] StoreError),
    #[error("领域错误: {0}")]
    Domain(DomainError),
    #[error("记录无效 {path}: {reason}")]
    InvalidRecord { path: String, reason: String },
}

impl ApplicationError {
    pub fn invalid_record(path: impl ToString, reason: impl ToString) -> Self {
        Self::InvalidRecord {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// 只有网络类错误值得调用方重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkFailure(_))
    }
}

impl From<DomainError> for ApplicationError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::NotRequestRecipient => ApplicationError::Unauthorized,
            other => ApplicationError::Domain(other),
        }
    }
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;
