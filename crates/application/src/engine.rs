use std::sync::Arc;

use config::EngineConfig;

use crate::{
    clock::{Clock, SystemClock},
    identity::IdentityProvider,
    services::{
        ChatRoomService, DirectoryService, FriendService, MessageService, PresenceService,
        ServiceDependencies,
    },
    store::RealtimeStore,
};

/// UI 层使用的统一入口，持有全部服务并共享同一组协作者
#[derive(Clone)]
pub struct SocialEngine {
    directory: Arc<DirectoryService>,
    friends: Arc<FriendService>,
    chat_rooms: Arc<ChatRoomService>,
    messages: Arc<MessageService>,
    presence: Arc<PresenceService>,
}

impl SocialEngine {
    pub fn new(deps: ServiceDependencies, config: &EngineConfig) -> Self {
        let name = config.default_display_name.as_str();
        let directory = Arc::new(DirectoryService::new(deps.clone(), name));
        Self {
            friends: Arc::new(FriendService::new(deps.clone(), directory.clone(), name)),
            chat_rooms: Arc::new(ChatRoomService::new(deps.clone())),
            messages: Arc::new(MessageService::new(
                deps.clone(),
                config.message_window,
                name,
            )),
            presence: Arc::new(PresenceService::new(deps)),
            directory,
        }
    }

    pub fn with_clock(
        store: Arc<dyn RealtimeStore>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> Self {
        Self::new(ServiceDependencies::new(store, identity, clock), config)
    }

    pub fn with_system_clock(
        store: Arc<dyn RealtimeStore>,
        identity: Arc<dyn IdentityProvider>,
        config: &EngineConfig,
    ) -> Self {
        Self::with_clock(store, identity, Arc::new(SystemClock), config)
    }

    pub fn directory(&self) -> &DirectoryService {
        &self.directory
    }

    pub fn friends(&self) -> &FriendService {
        &self.friends
    }

    pub fn chat_rooms(&self) -> &ChatRoomService {
        &self.chat_rooms
    }

    pub fn messages(&self) -> &MessageService {
        &self.messages
    }

    pub fn presence(&self) -> &PresenceService {
        &self.presence
    }
}
