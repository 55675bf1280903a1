//! 存储中的规范路径

use domain::{MessageId, RequestId, RoomId, UserId};

use crate::store::StorePath;

pub const USERS: &str = "users";
pub const FRIENDS: &str = "friends";
pub const STATUS: &str = "status";
pub const FRIEND_REQUESTS: &str = "friendRequests";
pub const CHAT_ROOMS: &str = "chatRooms";
pub const MESSAGES: &str = "messages";
pub const UNREAD_COUNT: &str = "unreadCount";
pub const PARTICIPANTS: &str = "participants";

pub fn users() -> StorePath {
    StorePath::root().child(USERS)
}

/// `users/{id}`
pub fn user(id: &UserId) -> StorePath {
    users().child(id)
}

/// `users/{id}/friends`
pub fn friends(owner: &UserId) -> StorePath {
    user(owner).child(FRIENDS)
}

/// `users/{id}/friends/{otherId}`
pub fn friend_edge(owner: &UserId, other: &UserId) -> StorePath {
    friends(owner).child(other)
}

/// `users/{id}/status`
pub fn status(id: &UserId) -> StorePath {
    user(id).child(STATUS)
}

pub fn friend_requests() -> StorePath {
    StorePath::root().child(FRIEND_REQUESTS)
}

/// `friendRequests/{id}`
pub fn friend_request(id: &RequestId) -> StorePath {
    friend_requests().child(id)
}

pub fn chat_rooms() -> StorePath {
    StorePath::root().child(CHAT_ROOMS)
}

/// `chatRooms/{id}`
pub fn chat_room(id: &RoomId) -> StorePath {
    chat_rooms().child(id)
}

/// `chatRooms/{id}/messages`
pub fn messages(room: &RoomId) -> StorePath {
    chat_room(room).child(MESSAGES)
}

/// `chatRooms/{id}/messages/{messageId}`
pub fn message(room: &RoomId, id: &MessageId) -> StorePath {
    messages(room).child(id)
}

/// `chatRooms/{id}/unreadCount/{userId}`
pub fn unread_count(room: &RoomId, user: &UserId) -> StorePath {
    chat_room(room).child(UNREAD_COUNT).child(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_paths() {
        let u1 = UserId::from("u1");
        let u2 = UserId::from("u2");
        let room = RoomId::from("u1_u2");
        assert_eq!(user(&u1).to_string(), "users/u1");
        assert_eq!(friend_edge(&u1, &u2).to_string(), "users/u1/friends/u2");
        assert_eq!(status(&u1).to_string(), "users/u1/status");
        assert_eq!(
            friend_request(&RequestId::from("r1")).to_string(),
            "friendRequests/r1"
        );
        assert_eq!(chat_room(&room).to_string(), "chatRooms/u1_u2");
        assert_eq!(
            message(&room, &MessageId::from("m1")).to_string(),
            "chatRooms/u1_u2/messages/m1"
        );
        assert_eq!(
            unread_count(&room, &u2).to_string(),
            "chatRooms/u1_u2/unreadCount/u2"
        );
    }
}
