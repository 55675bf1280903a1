use std::sync::RwLock;

use application::{CallerIdentity, IdentityProvider};

/// 进程内的登录状态，可在运行时切换调用者
#[derive(Debug, Default)]
pub struct StaticIdentity {
    current: RwLock<Option<CallerIdentity>>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(identity: CallerIdentity) -> Self {
        Self {
            current: RwLock::new(Some(identity)),
        }
    }

    pub fn sign_in(&self, identity: CallerIdentity) {
        tracing::info!(user_id = %identity.id, "用户登录");
        *self.current.write().unwrap_or_else(|p| p.into_inner()) = Some(identity);
    }

    pub fn sign_out(&self) {
        let previous = self
            .current
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(identity) = previous {
            tracing::info!(user_id = %identity.id, "用户退出");
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<CallerIdentity> {
        self.current
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}
