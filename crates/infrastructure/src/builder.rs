use std::sync::Arc;

use application::{CallerIdentity, Clock, SocialEngine, SystemClock};
use config::{AppConfig, ConfigError, EngineConfig};
use thiserror::Error;

use crate::{identity::StaticIdentity, memory_store::MemoryRealtimeStore};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 基于内存存储组装的一个客户端
///
/// 同一个存储上可以通过 [`InMemoryEngine::client`] 再开多个客户端，
/// 每个客户端有自己的登录状态，互相通过存储推送看到对方的写入。
#[derive(Clone)]
pub struct InMemoryEngine {
    store: Arc<MemoryRealtimeStore>,
    identity: Arc<StaticIdentity>,
    engine: SocialEngine,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl InMemoryEngine {
    pub fn from_config(config: &AppConfig) -> Result<Self, InfrastructureError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self, InfrastructureError> {
        config.validate()?;
        let store = Arc::new(MemoryRealtimeStore::from_config(&config.store));
        tracing::info!(
            message_window = config.engine.message_window,
            latency_ms = config.store.simulated_latency_ms,
            "初始化内存同步引擎"
        );
        Ok(Self::assemble(store, clock, config.engine.clone()))
    }

    fn assemble(
        store: Arc<MemoryRealtimeStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let identity = Arc::new(StaticIdentity::new());
        let engine = SocialEngine::with_clock(store.clone(), identity.clone(), clock.clone(), &config);
        Self {
            store,
            identity,
            engine,
            clock,
            config,
        }
    }

    /// 共享同一存储的新客户端，初始未登录
    pub fn client(&self) -> Self {
        Self::assemble(self.store.clone(), self.clock.clone(), self.config.clone())
    }

    pub fn sign_in(&self, identity: CallerIdentity) {
        self.identity.sign_in(identity);
    }

    pub fn sign_out(&self) {
        self.identity.sign_out();
    }

    pub fn engine(&self) -> &SocialEngine {
        &self.engine
    }

    pub fn store(&self) -> &Arc<MemoryRealtimeStore> {
        &self.store
    }

    pub fn identity(&self) -> &Arc<StaticIdentity> {
        &self.identity
    }
}
