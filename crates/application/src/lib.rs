//! 应用层实现。
//!
//! 好友图谱、聊天室、消息和在线状态的用例服务，
//! 通过 [`RealtimeStore`] 和 [`IdentityProvider`] 两个协作者访问外部世界。
//! 所有对外暴露的列表都已排序、去重并过滤掉无效记录。

pub mod clock;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod identity;
pub mod paths;
pub mod records;
pub mod sequencer;
pub mod services;
pub mod store;
pub mod subscription;

pub use clock::{Clock, SystemClock};
pub use dispatcher::MessageDispatcher;
pub use engine::SocialEngine;
pub use error::{ApplicationError, ApplicationResult, StoreError};
pub use identity::{CallerIdentity, IdentityProvider};
pub use sequencer::PushKeySequencer;
pub use services::{
    ChatRoomService, DirectoryService, FriendService, MessageService, PresenceService,
    ServiceDependencies,
};
pub use store::{ChildQuery, DataSnapshot, RealtimeStore, SnapshotStream, StorePath};
pub use subscription::Subscription;
