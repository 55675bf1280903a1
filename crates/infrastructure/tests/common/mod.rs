#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use application::{CallerIdentity, Clock};
use chrono::{TimeZone, Utc};
use config::AppConfig;
use domain::Timestamp;
use infrastructure::InMemoryEngine;
use tokio::sync::mpsc;

/// 每次读取前进 1 毫秒的时钟，保证时间戳严格递增
pub struct SteppingClock {
    next: AtomicI64,
}

impl SteppingClock {
    pub fn starting_at(millis: i64) -> Arc<Self> {
        Arc::new(Self {
            next: AtomicI64::new(millis),
        })
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Timestamp {
        let millis = self.next.fetch_add(1, Ordering::SeqCst);
        Utc.timestamp_millis_opt(millis).unwrap()
    }
}

pub fn identity(id: &str, name: &str) -> CallerIdentity {
    CallerIdentity::new(id)
        .with_display_name(name)
        .with_email(format!("{}@pets.example", name.to_lowercase()))
}

/// 共享同一存储的多个已登录客户端，资料都已写入目录
pub async fn clients(users: &[(&str, &str)]) -> Vec<InMemoryEngine> {
    let base = InMemoryEngine::with_clock(
        &AppConfig::default(),
        SteppingClock::starting_at(1_700_000_000_000),
    )
    .unwrap();

    let mut clients = Vec::with_capacity(users.len());
    for (id, name) in users {
        let client = base.client();
        client.sign_in(identity(id, name));
        client.engine().directory().ensure_profile().await.unwrap();
        clients.push(client);
    }
    clients
}

/// 把订阅回调的每次推送收集到通道里
pub struct Collector<T> {
    receiver: mpsc::UnboundedReceiver<T>,
}

pub fn collector<T: Send + 'static>() -> (impl FnMut(T) + Send + 'static, Collector<T>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let callback = move |value: T| {
        let _ = sender.send(value);
    };
    (callback, Collector { receiver })
}

impl<T> Collector<T> {
    pub async fn next(&mut self) -> T {
        tokio::time::timeout(Duration::from_secs(2), self.receiver.recv())
            .await
            .expect("timed out waiting for a delivery")
            .expect("subscription closed")
    }

    /// 等到满足条件的推送为止
    pub async fn until(&mut self, mut predicate: impl FnMut(&T) -> bool) -> T {
        loop {
            let value = self.next().await;
            if predicate(&value) {
                return value;
            }
        }
    }

    /// 等待一小段时间，确认没有新的推送
    pub async fn assert_quiet(&mut self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(self.receiver.try_recv().is_err(), "unexpected delivery");
    }
}
