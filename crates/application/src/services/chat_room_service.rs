use domain::{sort_rooms_by_activity, ChatRoom, RoomId, UserId};
use serde_json::{json, Map, Value};

use super::{present, ServiceDependencies};
use crate::{
    error::{ApplicationError, ApplicationResult},
    paths,
    records::decode_chat_room,
    store::{ChildQuery, DataSnapshot},
    subscription::Subscription,
};

/// 一对一聊天室：ID 由双方用户 ID 排序后拼接，重复创建得到同一个房间
pub struct ChatRoomService {
    deps: ServiceDependencies,
}

impl ChatRoomService {
    pub fn new(deps: ServiceDependencies) -> Self {
        Self { deps }
    }

    /// 房间不存在时创建，已存在时原样返回 ID，不会覆盖 `createdAt`
    pub async fn get_or_create_chat_room(&self, participants: &[UserId]) -> ApplicationResult<RoomId> {
        self.deps.caller()?;
        let (room_id, members) = RoomId::for_participants(participants)?;
        materialize_room(&self.deps, &room_id, &members).await?;
        Ok(room_id)
    }

    pub async fn get_chat_room(&self, room_id: &RoomId) -> ApplicationResult<Option<ChatRoom>> {
        room_id.check()?;
        let path = paths::chat_room(room_id);
        match present(self.deps.store.get(&path).await?) {
            Some(value) => decode_chat_room(room_id.as_str(), value)
                .map(Some)
                .map_err(|err| ApplicationError::invalid_record(&path, err)),
            None => Ok(None),
        }
    }

    /// `user_id` 参与的房间，按最近活动排序
    pub async fn get_user_chat_rooms(&self, user_id: &UserId) -> ApplicationResult<Vec<ChatRoom>> {
        let path = paths::chat_rooms();
        let value = self.deps.store.get(&path).await?;
        Ok(rooms_of(user_id, DataSnapshot::new(path, value)))
    }

    pub async fn on_user_chat_rooms<F>(
        &self,
        user_id: &UserId,
        callback: F,
    ) -> ApplicationResult<Subscription>
    where
        F: FnMut(Vec<ChatRoom>) + Send + 'static,
    {
        let path = paths::chat_rooms();
        let stream = self.deps.store.subscribe(&path, ChildQuery::all()).await?;
        let member = user_id.clone();
        Ok(Subscription::spawn(
            "chat_rooms",
            path,
            stream,
            move |snapshot| Some(rooms_of(&member, snapshot)),
            callback,
        ))
    }
}

/// 参与者列表存在即视为房间已创建；未读数等子节点可能先于房间写入
pub(crate) async fn materialize_room(
    deps: &ServiceDependencies,
    room_id: &RoomId,
    members: &[UserId; 2],
) -> ApplicationResult<bool> {
    let path = paths::chat_room(room_id);
    let created = deps
        .store
        .create_if_absent(&path.child(paths::PARTICIPANTS), json!(members))
        .await?;
    if !created {
        tracing::debug!(room_id = %room_id, "聊天室已存在");
        return Ok(false);
    }

    let now = json!(deps.clock.now().timestamp_millis());
    let mut fields = Map::new();
    fields.insert("createdAt".to_owned(), now.clone());
    fields.insert("lastMessageTime".to_owned(), now);
    deps.store.update(&path, fields).await?;
    tracing::info!(room_id = %room_id, "创建聊天室");
    Ok(true)
}

fn rooms_of(user_id: &UserId, snapshot: DataSnapshot) -> Vec<ChatRoom> {
    let mut rooms: Vec<ChatRoom> = snapshot
        .into_children()
        .into_iter()
        .filter(|(_, value)| !matches!(value, Value::Null))
        .filter_map(|(key, value)| match decode_chat_room(&key, value) {
            Ok(room) => Some(room),
            Err(err) => {
                tracing::debug!(room_id = %key, error = %err, "跳过无效的聊天室记录");
                None
            }
        })
        .filter(|room| room.includes(user_id))
        .collect();
    sort_rooms_by_activity(&mut rooms);
    rooms
}
