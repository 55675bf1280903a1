//! 消息分发器
//!
//! 把存储推送的消息窗口快照规范化成有序消息列表：
//! 过滤空值和损坏记录，按 `(timestamp, id)` 排序，
//! 与上一次交付的列表做结构比较，内容没变就不再交付。
//! 展示顺序完全由排序保证，与推送到达的顺序无关。

use domain::{sort_messages, Message};
use serde_json::Value;

use crate::records::decode_message;
use crate::store::DataSnapshot;

#[derive(Debug)]
pub struct MessageDispatcher {
    window: usize,
    delivered: Option<Vec<Message>>,
}

impl MessageDispatcher {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            delivered: None,
        }
    }

    /// 过滤并排序一组原始子节点，只保留最新的 `window` 条
    pub fn normalize(&self, entries: Vec<(String, Value)>) -> Vec<Message> {
        let mut messages: Vec<Message> = entries
            .into_iter()
            .filter_map(|(key, value)| decode_message(&key, value))
            .collect();
        sort_messages(&mut messages);
        if messages.len() > self.window {
            messages.drain(..messages.len() - self.window);
        }
        messages
    }

    /// 处理一次推送；返回 `None` 表示与上次交付的内容相同
    pub fn accept(&mut self, snapshot: DataSnapshot) -> Option<Vec<Message>> {
        let path = snapshot.path.clone();
        let messages = self.normalize(snapshot.into_children());

        if self.delivered.as_ref() == Some(&messages) {
            tracing::trace!(path = %path, count = messages.len(), "消息快照未变化，跳过");
            return None;
        }

        tracing::debug!(
            path = %path,
            count = messages.len(),
            latest = messages.last().map(|m| m.id.as_str()),
            "交付消息快照"
        );
        self.delivered = Some(messages.clone());
        Some(messages)
    }

    pub fn last_delivered(&self) -> Option<&[Message]> {
        self.delivered.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StorePath;
    use serde_json::json;

    fn record(id: &str, millis: i64, text: &str) -> Value {
        json!({
            "id": id,
            "text": text,
            "senderId": "u1",
            "senderName": "Ann",
            "timestamp": millis,
            "type": "text"
        })
    }

    fn snapshot(entries: Vec<(&str, Value)>) -> DataSnapshot {
        let map: serde_json::Map<String, Value> = entries
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect();
        DataSnapshot::new(
            StorePath::parse("chatRooms/u1_u2/messages"),
            Some(Value::Object(map)),
        )
    }

    fn texts(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn sorts_by_timestamp_regardless_of_arrival() {
        let mut dispatcher = MessageDispatcher::new(100);
        let delivered = dispatcher
            .accept(snapshot(vec![
                ("k1", record("k1", 3_000, "third")),
                ("k2", record("k2", 1_000, "first")),
                ("k3", record("k3", 2_000, "second")),
            ]))
            .unwrap();
        assert_eq!(texts(&delivered), ["first", "second", "third"]);
    }

    #[test]
    fn unchanged_resend_is_not_redelivered() {
        let mut dispatcher = MessageDispatcher::new(100);
        let entries = || vec![("k1", record("k1", 1, "a")), ("k2", record("k2", 2, "b"))];
        assert!(dispatcher.accept(snapshot(entries())).is_some());
        assert!(dispatcher.accept(snapshot(entries())).is_none());

        let mut more = entries();
        more.push(("k3", record("k3", 3, "c")));
        assert_eq!(dispatcher.accept(snapshot(more)).unwrap().len(), 3);
    }

    #[test]
    fn same_length_and_last_id_with_different_content_is_delivered() {
        let mut dispatcher = MessageDispatcher::new(100);
        dispatcher
            .accept(snapshot(vec![("k1", record("k1", 1, "a")), ("k3", record("k3", 3, "c"))]))
            .unwrap();
        // 中间一条被删、另一条补上：长度和最后一条都没变
        let delivered = dispatcher
            .accept(snapshot(vec![("k2", record("k2", 2, "b")), ("k3", record("k3", 3, "c"))]))
            .unwrap();
        assert_eq!(texts(&delivered), ["b", "c"]);
    }

    #[test]
    fn filters_tombstones_and_malformed_records() {
        let mut dispatcher = MessageDispatcher::new(100);
        let delivered = dispatcher
            .accept(snapshot(vec![
                ("k1", record("k1", 1, "kept")),
                ("k2", Value::Null),
                ("k3", json!({ "text": "no id", "timestamp": 2 })),
                ("k4", json!("garbage")),
            ]))
            .unwrap();
        assert_eq!(texts(&delivered), ["kept"]);
    }

    #[test]
    fn empty_room_delivers_once() {
        let mut dispatcher = MessageDispatcher::new(100);
        let empty = DataSnapshot::new(StorePath::parse("chatRooms/x/messages"), None);
        assert_eq!(dispatcher.accept(empty.clone()), Some(Vec::new()));
        assert_eq!(dispatcher.accept(empty), None);
    }

    #[test]
    fn keeps_only_the_latest_window() {
        let mut dispatcher = MessageDispatcher::new(2);
        let delivered = dispatcher
            .accept(snapshot(vec![
                ("k1", record("k1", 1, "a")),
                ("k2", record("k2", 2, "b")),
                ("k3", record("k3", 3, "c")),
            ]))
            .unwrap();
        assert_eq!(texts(&delivered), ["b", "c"]);
        assert_eq!(dispatcher.last_delivered().map(<[Message]>::len), Some(2));
    }

    #[test]
    fn equal_timestamps_fall_back_to_creation_id() {
        let mut dispatcher = MessageDispatcher::new(10);
        let delivered = dispatcher
            .accept(snapshot(vec![
                ("-b", record("-b", 5, "second")),
                ("-a", record("-a", 5, "first")),
            ]))
            .unwrap();
        assert_eq!(texts(&delivered), ["first", "second"]);
    }
}
