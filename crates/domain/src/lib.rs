//! 好友关系与聊天同步引擎的领域模型
//!
//! 包含用户资料、好友请求状态机、好友边、聊天室身份、消息和在线状态，
//! 不涉及任何存储或网络。

pub mod chat_room;
pub mod errors;
pub mod friend;
pub mod message;
pub mod presence;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use chat_room::{sort_rooms_by_activity, ChatRoom, ROOM_ID_SEPARATOR};
pub use errors::{DomainError, DomainResult};
pub use friend::{
    sort_friends, Friend, FriendLink, FriendRequest, FriendRequestStatus, ProfileCard,
};
pub use message::{sort_messages, GeoPoint, Message, MessageDraft, MessagePayload};
pub use presence::PresenceStatus;
pub use user::{ProfileUpdate, User};
pub use value_objects::{
    timestamp_from_millis, MessageId, RequestId, RoomId, Timestamp, UserId,
};
