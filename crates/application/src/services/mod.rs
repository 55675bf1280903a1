mod chat_room_service;
mod directory_service;
mod friend_service;
mod message_service;
mod presence_service;

use std::sync::Arc;

use serde_json::Value;

use crate::{
    clock::Clock,
    error::{ApplicationError, ApplicationResult},
    identity::{CallerIdentity, IdentityProvider},
    sequencer::PushKeySequencer,
    store::RealtimeStore,
};

pub use chat_room_service::ChatRoomService;
pub use directory_service::DirectoryService;
pub use friend_service::FriendService;
pub use message_service::MessageService;
pub use presence_service::PresenceService;

/// 所有服务共用的协作者
#[derive(Clone)]
pub struct ServiceDependencies {
    pub store: Arc<dyn RealtimeStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub clock: Arc<dyn Clock>,
    pub sequencer: Arc<PushKeySequencer>,
}

impl ServiceDependencies {
    pub fn new(
        store: Arc<dyn RealtimeStore>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            identity,
            clock,
            sequencer: Arc::new(PushKeySequencer::new()),
        }
    }

    /// 当前调用者；未登录时在任何 I/O 之前失败
    pub(crate) fn caller(&self) -> ApplicationResult<CallerIdentity> {
        self.identity
            .current_user()
            .ok_or(ApplicationError::Unauthenticated)
    }
}

/// 点读结果中 `null` 与不存在等价
pub(crate) fn present(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}
