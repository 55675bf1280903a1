//! 实时键值存储抽象
//!
//! 存储是一棵按路径寻址的 JSON 树，支持点读写、部分字段更新、删除、
//! 多路径原子写入、条件创建、原子计数，以及子树订阅。
//! 订阅推送的是整个子树（或查询窗口）的快照，可能重复推送同一内容，
//! 与其它订阅之间、与调用者自己的写入之间都没有顺序保证。

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::StoreError;

/// 存储中的路径，例如 `chatRooms/u1_u2/messages`。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath(Vec<String>);

impl StorePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// 按 `/` 拆分，忽略空段。
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    pub fn child(&self, segment: impl AsRef<str>) -> Self {
        let mut segments = self.0.clone();
        segments.extend(
            segment
                .as_ref()
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        );
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// 最后一段，根路径没有键。
    pub fn key(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// `self` 等于 `other` 或是它的祖先。
    pub fn contains(&self, other: &StorePath) -> bool {
        other.0.starts_with(&self.0)
    }

    /// 两条路径在同一条祖先链上时，对其中一条的写入会影响另一条的快照。
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.contains(other) || other.contains(self)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// 对子节点的有序/限量查询。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildQuery {
    /// 按子节点的某个字段排序；为空时按键排序
    pub order_by_child: Option<String>,
    /// 只保留排序后的最后 N 个
    pub limit_to_last: Option<usize>,
}

impl ChildQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn ordered_by(child: impl Into<String>) -> Self {
        Self {
            order_by_child: Some(child.into()),
            limit_to_last: None,
        }
    }

    pub fn limit_to_last(mut self, limit: usize) -> Self {
        self.limit_to_last = Some(limit);
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.order_by_child.is_none() && self.limit_to_last.is_none()
    }
}

/// 某条路径在某一时刻的值。`value` 为 `None` 表示节点不存在。
#[derive(Debug, Clone, PartialEq)]
pub struct DataSnapshot {
    pub path: StorePath,
    pub value: Option<Value>,
}

impl DataSnapshot {
    pub fn new(path: StorePath, value: Option<Value>) -> Self {
        Self { path, value }
    }

    pub fn exists(&self) -> bool {
        self.value.as_ref().is_some_and(|v| !v.is_null())
    }

    /// 子节点列表；非对象节点没有子节点。
    pub fn into_children(self) -> Vec<(String, Value)> {
        match self.value {
            Some(Value::Object(map)) => map.into_iter().collect(),
            _ => Vec::new(),
        }
    }
}

/// 订阅推送流，由存储实现写入。
pub struct SnapshotStream {
    receiver: mpsc::UnboundedReceiver<DataSnapshot>,
}

impl SnapshotStream {
    pub fn new(receiver: mpsc::UnboundedReceiver<DataSnapshot>) -> Self {
        Self { receiver }
    }

    pub fn channel() -> (mpsc::UnboundedSender<DataSnapshot>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (sender, Self::new(receiver))
    }

    /// 下一次推送；存储端关闭后返回 `None`。
    pub async fn next(&mut self) -> Option<DataSnapshot> {
        self.receiver.recv().await
    }
}

impl fmt::Debug for SnapshotStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotStream").finish_non_exhaustive()
    }
}

/// 实时键值存储协作者。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// 点读
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError>;

    /// 覆盖写入，写入 `Value::Null` 等价于删除
    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError>;

    /// 只更新给定的直接子字段
    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<(), StoreError>;

    async fn remove(&self, path: &StorePath) -> Result<(), StoreError>;

    /// 多路径原子写入：要么全部生效，要么全部不生效
    async fn write_batch(&self, writes: Vec<(StorePath, Value)>) -> Result<(), StoreError>;

    /// 节点不存在时写入并返回 `true`，已存在时不做任何修改并返回 `false`
    async fn create_if_absent(&self, path: &StorePath, value: Value) -> Result<bool, StoreError>;

    /// 原子地给数值节点加上 `delta`，返回新值；不存在或非数值时按 0 处理
    async fn increment(&self, path: &StorePath, delta: i64) -> Result<i64, StoreError>;

    /// 对子节点做有序/限量查询
    async fn query(
        &self,
        path: &StorePath,
        query: ChildQuery,
    ) -> Result<Vec<(String, Value)>, StoreError>;

    /// 订阅子树，立即推送一次当前快照，之后每次相关写入都推送完整快照
    async fn subscribe(
        &self,
        path: &StorePath,
        query: ChildQuery,
    ) -> Result<SnapshotStream, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_parsing_and_display() {
        let path = StorePath::parse("/chatRooms//u1_u2/messages/");
        assert_eq!(path.segments(), ["chatRooms", "u1_u2", "messages"]);
        assert_eq!(path.to_string(), "chatRooms/u1_u2/messages");
        assert_eq!(path.key(), Some("messages"));
        assert_eq!(path.parent(), Some(StorePath::parse("chatRooms/u1_u2")));
        assert_eq!(StorePath::root().parent(), None);
    }

    #[test]
    fn containment_and_overlap() {
        let room = StorePath::parse("chatRooms/u1_u2");
        let message = room.child("messages").child("m1");
        assert!(room.contains(&message));
        assert!(!message.contains(&room));
        assert!(message.overlaps(&room));
        assert!(!room.overlaps(&StorePath::parse("chatRooms/u1_u3")));
        assert!(StorePath::root().contains(&room));
    }

    #[test]
    fn snapshot_children() {
        let snapshot = DataSnapshot::new(
            StorePath::parse("users/u1/friends"),
            Some(serde_json::json!({ "u2": { "name": "Bob" } })),
        );
        assert!(snapshot.exists());
        let children = snapshot.into_children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].0, "u2");

        let empty = DataSnapshot::new(StorePath::root(), Some(Value::Null));
        assert!(!empty.exists());
        assert!(empty.into_children().is_empty());
    }
}
