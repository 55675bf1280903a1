use domain::{ProfileCard, UserId};

/// 当前调用者的身份信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub id: UserId,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

impl CallerIdentity {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            email: None,
            avatar: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// 仅凭身份信息得到的显示快照，名称缺失时使用 `fallback_name`。
    pub fn card(&self, fallback_name: &str) -> ProfileCard {
        ProfileCard {
            id: self.id.clone(),
            name: self
                .display_name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| fallback_name.to_owned()),
            avatar: self.avatar.clone().filter(|a| !a.is_empty()),
        }
    }
}

/// 身份协作者：提供“当前调用者是谁”。
#[cfg_attr(test, mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<CallerIdentity>;
}
