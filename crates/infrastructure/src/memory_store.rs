//! 进程内实时存储
//!
//! 用一棵 `serde_json::Value` 树模拟托管的实时数据库：
//! - 写入 `null` 等于删除，删除后空的父节点一并清理
//! - 所有写入在同一把锁内完成并通知订阅者，批量写入天然原子
//! - 订阅建立时立即推送一次当前快照，之后每次相关写入推送完整快照
//!
//! 另外提供重复推送、离线故障和固定延迟，用来测试上层的去重与错误处理。

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Duration;

use application::{ChildQuery, DataSnapshot, RealtimeStore, SnapshotStream, StoreError, StorePath};
use async_trait::async_trait;
use config::StoreConfig;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, Mutex};

struct Subscriber {
    path: StorePath,
    query: ChildQuery,
    sender: mpsc::UnboundedSender<DataSnapshot>,
}

#[derive(Default)]
struct StoreState {
    root: Value,
    subscribers: Vec<Subscriber>,
}

impl StoreState {
    fn read(&self, path: &StorePath) -> Option<Value> {
        let mut node = &self.root;
        for segment in path.segments() {
            node = node.as_object()?.get(segment)?;
        }
        (!node.is_null()).then(|| node.clone())
    }

    fn write(&mut self, path: &StorePath, value: Value) {
        write_at(&mut self.root, path.segments(), normalize(value));
        if self.root.as_object().is_some_and(Map::is_empty) {
            self.root = Value::Null;
        }
    }

    fn snapshot_for(&self, subscriber: &Subscriber) -> DataSnapshot {
        let value = self.read(&subscriber.path);
        let value = if subscriber.query.is_unbounded() {
            value
        } else {
            let children = apply_query(value, &subscriber.query);
            (!children.is_empty()).then(|| Value::Object(children.into_iter().collect()))
        };
        DataSnapshot::new(subscriber.path.clone(), value)
    }

    /// 给与 `written` 中任一路径重叠的订阅者推送快照，顺便清理已关闭的订阅
    fn notify(&mut self, written: &[StorePath]) {
        self.subscribers.retain(|s| !s.sender.is_closed());
        for subscriber in &self.subscribers {
            if written.iter().any(|path| path.overlaps(&subscriber.path)) {
                let snapshot = self.snapshot_for(subscriber);
                if subscriber.sender.send(snapshot).is_err() {
                    tracing::trace!(path = %subscriber.path, "订阅者已关闭");
                }
            }
        }
    }
}

/// 去掉 `null` 子节点和空对象；整个值为空时返回 `None`
fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(key, child)| normalize(child).map(|child| (key, child)))
                .collect();
            (!cleaned.is_empty()).then_some(Value::Object(cleaned))
        }
        other => Some(other),
    }
}

fn write_at(node: &mut Value, segments: &[String], value: Option<Value>) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value.unwrap_or(Value::Null);
        return;
    };
    if !node.is_object() {
        if value.is_none() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return;
    };
    let child = map.entry(head.clone()).or_insert(Value::Null);
    write_at(child, rest, value);
    if child.is_null() || child.as_object().is_some_and(Map::is_empty) {
        map.remove(head);
    }
}

/// 排序值的类别，与托管数据库一致：缺失 < 布尔 < 数值 < 字符串 < 对象
fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(_) => 4,
    }
}

fn compare_child_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    rank(a).cmp(&rank(b)).then_with(|| match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => Ordering::Equal,
    })
}

fn apply_query(value: Option<Value>, query: &ChildQuery) -> Vec<(String, Value)> {
    let mut children: Vec<(String, Value)> = match value {
        Some(Value::Object(map)) => map.into_iter().collect(),
        _ => return Vec::new(),
    };
    if let Some(field) = query.order_by_child.as_deref() {
        children.sort_by(|(ka, va), (kb, vb)| {
            compare_child_values(va.get(field), vb.get(field)).then_with(|| ka.cmp(kb))
        });
    } else {
        children.sort_by(|(ka, _), (kb, _)| ka.cmp(kb));
    }
    if let Some(limit) = query.limit_to_last {
        let skip = children.len().saturating_sub(limit);
        children.drain(..skip);
    }
    children
}

/// 内存中的 [`RealtimeStore`] 实现
pub struct MemoryRealtimeStore {
    state: Mutex<StoreState>,
    latency: Duration,
    offline: AtomicBool,
}

impl Default for MemoryRealtimeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRealtimeStore {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            latency,
            offline: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::with_latency(Duration::from_millis(config.simulated_latency_ms))
    }

    /// 离线时所有操作都返回 `StoreError::Unavailable`，已有订阅不受影响
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
        tracing::info!(offline, "切换内存存储的连接状态");
    }

    /// 不经过订阅通知直接写入，用来准备测试数据
    pub async fn seed(&self, path: &StorePath, value: Value) {
        self.state.lock().await.write(path, value);
    }

    /// 给相关订阅者重新推送当前快照，内容没有变化
    pub async fn resend(&self, path: &StorePath) {
        self.state.lock().await.notify(std::slice::from_ref(path));
    }

    /// 仍然有效的订阅数量
    pub async fn subscriber_count(&self) -> usize {
        let mut state = self.state.lock().await;
        state.subscribers.retain(|s| !s.sender.is_closed());
        state.subscribers.len()
    }

    /// 整棵树的副本
    pub async fn dump(&self) -> Value {
        self.state.lock().await.root.clone()
    }

    async fn round_trip(&self) -> Result<(), StoreError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::unavailable("memory store is offline"));
        }
        Ok(())
    }

    async fn apply(&self, writes: Vec<(StorePath, Value)>) -> Result<(), StoreError> {
        self.round_trip().await?;
        let mut state = self.state.lock().await;
        let paths: Vec<StorePath> = writes.iter().map(|(path, _)| path.clone()).collect();
        for (path, value) in writes {
            state.write(&path, value);
        }
        state.notify(&paths);
        Ok(())
    }
}

#[async_trait]
impl RealtimeStore for MemoryRealtimeStore {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        self.round_trip().await?;
        Ok(self.state.lock().await.read(path))
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.apply(vec![(path.clone(), value)]).await
    }

    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<(), StoreError> {
        let writes = fields
            .into_iter()
            .map(|(field, value)| (path.child(field), value))
            .collect();
        self.apply(writes).await
    }

    async fn remove(&self, path: &StorePath) -> Result<(), StoreError> {
        self.apply(vec![(path.clone(), Value::Null)]).await
    }

    async fn write_batch(&self, writes: Vec<(StorePath, Value)>) -> Result<(), StoreError> {
        self.apply(writes).await
    }

    async fn create_if_absent(&self, path: &StorePath, value: Value) -> Result<bool, StoreError> {
        self.round_trip().await?;
        let mut state = self.state.lock().await;
        if state.read(path).is_some() {
            return Ok(false);
        }
        state.write(path, value);
        state.notify(std::slice::from_ref(path));
        Ok(true)
    }

    async fn increment(&self, path: &StorePath, delta: i64) -> Result<i64, StoreError> {
        self.round_trip().await?;
        let mut state = self.state.lock().await;
        let current = state
            .read(path)
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
            .unwrap_or(0);
        let next = current.saturating_add(delta);
        state.write(path, Value::from(next));
        state.notify(std::slice::from_ref(path));
        Ok(next)
    }

    async fn query(
        &self,
        path: &StorePath,
        query: ChildQuery,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        self.round_trip().await?;
        let value = self.state.lock().await.read(path);
        Ok(apply_query(value, &query))
    }

    async fn subscribe(
        &self,
        path: &StorePath,
        query: ChildQuery,
    ) -> Result<SnapshotStream, StoreError> {
        self.round_trip().await?;
        let (sender, stream) = SnapshotStream::channel();
        let subscriber = Subscriber {
            path: path.clone(),
            query,
            sender,
        };

        let mut state = self.state.lock().await;
        let initial = state.snapshot_for(&subscriber);
        // 接收端就在手里，首次推送不会失败
        let _ = subscriber.sender.send(initial);
        state.subscribers.push(subscriber);
        tracing::debug!(path = %path, "新增订阅");
        Ok(stream)
    }
}
