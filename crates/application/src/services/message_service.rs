//! 房间消息
//!
//! 发送分三步：写入消息、刷新房间摘要、给其他参与者的未读数加一。
//! 三步不是原子的，中途失败时消息已经存在，摘要和未读数可能滞后。
//! 房间尚未创建时，发送前先按房间 ID 还原出参与者把房间建好。

use domain::{sort_messages, Message, MessageDraft, MessageId, RoomId, UserId};
use serde_json::{json, Map, Value};

use super::{chat_room_service::materialize_room, ServiceDependencies};
use crate::{
    dispatcher::MessageDispatcher,
    error::{ApplicationError, ApplicationResult},
    paths,
    records::{decode_message, encode},
    store::ChildQuery,
    subscription::Subscription,
};

pub struct MessageService {
    deps: ServiceDependencies,
    message_window: usize,
    default_display_name: String,
}

impl MessageService {
    pub fn new(
        deps: ServiceDependencies,
        message_window: usize,
        default_display_name: impl Into<String>,
    ) -> Self {
        Self {
            deps,
            message_window: message_window.max(1),
            default_display_name: default_display_name.into(),
        }
    }

    /// 发送消息，返回新消息的 ID
    pub async fn send_message(
        &self,
        room_id: &RoomId,
        draft: MessageDraft,
    ) -> ApplicationResult<MessageId> {
        let caller = self.deps.caller()?;
        let members = room_id.participants()?;
        materialize_room(&self.deps, room_id, &members).await?;

        let sender = caller.card(&self.default_display_name);
        let now = self.deps.clock.now();
        let id = MessageId::from(self.deps.sequencer.next_key(now));

        let message = Message {
            id: id.clone(),
            text: draft.text,
            sender_id: caller.id.clone(),
            sender_name: sender.name,
            sender_avatar: sender.avatar,
            timestamp: now,
            payload: draft.payload,
        };
        let record = encode(&message)?;
        self.deps
            .store
            .set(&paths::message(room_id, &id), record.clone())
            .await?;

        let mut summary = Map::new();
        summary.insert("lastMessage".to_owned(), record);
        summary.insert("lastMessageTime".to_owned(), json!(now.timestamp_millis()));
        self.deps
            .store
            .update(&paths::chat_room(room_id), summary)
            .await?;

        for other in members.iter().filter(|member| **member != caller.id) {
            let count = self
                .deps
                .store
                .increment(&paths::unread_count(room_id, other), 1)
                .await?;
            tracing::debug!(room_id = %room_id, user_id = %other, count, "未读数加一");
        }

        tracing::info!(room_id = %room_id, message_id = %id, sender = %caller.id, "发送消息");
        Ok(id)
    }

    /// 订阅最近的消息窗口
    ///
    /// 每次推送都是按 `(timestamp, id)` 排好序的完整列表；
    /// 内容与上次交付相同的推送会被丢弃。
    pub async fn on_messages<F>(&self, room_id: &RoomId, callback: F) -> ApplicationResult<Subscription>
    where
        F: FnMut(Vec<Message>) + Send + 'static,
    {
        room_id.check()?;
        let path = paths::messages(room_id);
        let query = ChildQuery::ordered_by("timestamp").limit_to_last(self.message_window);
        let stream = self.deps.store.subscribe(&path, query).await?;
        let mut dispatcher = MessageDispatcher::new(self.message_window);
        Ok(Subscription::spawn(
            "messages",
            path,
            stream,
            move |snapshot| dispatcher.accept(snapshot),
            callback,
        ))
    }

    /// 把 `user_id` 在房间里的未读数清零，只能由本人调用
    pub async fn mark_messages_as_read(&self, room_id: &RoomId, user_id: &UserId) -> ApplicationResult<()> {
        let caller = self.deps.caller()?;
        if caller.id != *user_id {
            return Err(ApplicationError::Unauthorized);
        }
        room_id.check()?;
        self.deps
            .store
            .set(&paths::unread_count(room_id, user_id), json!(0))
            .await?;
        tracing::debug!(room_id = %room_id, user_id = %user_id, "未读数清零");
        Ok(())
    }

    pub async fn get_unread_count(&self, room_id: &RoomId, user_id: &UserId) -> ApplicationResult<u32> {
        room_id.check()?;
        user_id.check()?;
        let value = self
            .deps
            .store
            .get(&paths::unread_count(room_id, user_id))
            .await?;
        Ok(value
            .as_ref()
            .and_then(Value::as_i64)
            .map(|count| count.clamp(0, i64::from(u32::MAX)) as u32)
            .unwrap_or(0))
    }

    /// 删除后原位置为空，订阅方会把它从列表中过滤掉
    pub async fn delete_message(&self, room_id: &RoomId, message_id: &MessageId) -> ApplicationResult<()> {
        let caller = self.deps.caller()?;
        room_id.check()?;
        message_id.check()?;
        self.deps
            .store
            .remove(&paths::message(room_id, message_id))
            .await?;
        tracing::info!(room_id = %room_id, message_id = %message_id, user_id = %caller.id, "删除消息");
        Ok(())
    }

    /// 房间内文本包含 `needle` 的消息（不区分大小写），按展示顺序返回
    pub async fn search_messages(&self, room_id: &RoomId, needle: &str) -> ApplicationResult<Vec<Message>> {
        room_id.check()?;
        let mut found: Vec<Message> = self
            .deps
            .store
            .query(&paths::messages(room_id), ChildQuery::ordered_by("timestamp"))
            .await?
            .into_iter()
            .filter_map(|(key, value)| decode_message(&key, value))
            .filter(|message| message.text_contains(needle))
            .collect();
        sort_messages(&mut found);
        Ok(found)
    }
}
