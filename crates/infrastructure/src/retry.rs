//! 调用方的重试策略
//!
//! 服务本身从不重试；只有网络类错误值得由调用方按退避策略再试。

use std::future::Future;
use std::time::Duration;

use application::{ApplicationError, StoreError};
use tokio::time::sleep;

#[derive(Clone, Debug)]
pub enum Backoff {
    Fixed { delay: Duration },
    Exponential { base: Duration },
}

impl Backoff {
    pub fn fixed(delay: Duration) -> Self {
        Backoff::Fixed { delay }
    }

    pub fn exponential(base: Duration) -> Self {
        Backoff::Exponential { base }
    }

    fn delay_at(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Fixed { delay } => *delay,
            Backoff::Exponential { base } => {
                let exp = std::cmp::min(attempt.saturating_sub(1), 20);
                let factor = 1u32 << exp;
                base.saturating_mul(factor)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::exponential(Duration::from_millis(50)),
        }
    }
}

pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for ApplicationError {
    fn is_retryable(&self) -> bool {
        ApplicationError::is_retryable(self)
    }
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        !matches!(self, StoreError::Serialization(_))
    }
}

pub async fn retry_async<F, Fut, T, E>(config: &RetryConfig, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempt >= config.max_attempts || !e.is_retryable() {
                    return Err(e);
                }
                let delay = config.backoff.delay_at(attempt);
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "操作失败，稍后重试");
                sleep(delay).await;
            }
        }
    }
}
