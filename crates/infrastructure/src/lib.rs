//! 基础设施层实现。
//!
//! 提供内存实时存储、进程内身份、重试策略，以及把它们组装成
//! [`application::SocialEngine`] 的构建器。

pub mod builder;
pub mod identity;
pub mod memory_store;
pub mod retry;

pub use builder::{InMemoryEngine, InfrastructureError};
pub use identity::StaticIdentity;
pub use memory_store::MemoryRealtimeStore;
pub use retry::{retry_async, Backoff, RetryConfig, Retryable};
