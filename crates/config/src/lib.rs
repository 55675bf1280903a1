//! 统一配置中心
//!
//! 提供同步引擎的全局配置，包括：
//! - 消息窗口和默认显示名
//! - 内存存储的模拟延迟
//! - 日志过滤规则
//!
//! 加载顺序：内置默认值 → 可选的 YAML 文件 → `PETSYNC_` 前缀的环境变量
//! （嵌套字段用 `__` 分隔，例如 `PETSYNC_ENGINE__MESSAGE_WINDOW=50`）。

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "PETSYNC_";

/// 全局应用配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 引擎配置
    #[serde(default)]
    pub engine: EngineConfig,
    /// 存储配置
    #[serde(default)]
    pub store: StoreConfig,
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 引擎配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 消息订阅窗口：只观察最近 N 条消息
    pub message_window: usize,
    /// 身份和资料都缺少名称时使用的显示名
    pub default_display_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            message_window: 100,
            default_display_name: "User".to_string(),
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// 内存存储每次操作的模拟网络延迟（毫秒）
    pub simulated_latency_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `RUST_LOG` 未设置时使用的过滤规则
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// 按默认值、配置文件、环境变量的顺序合并配置
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::MissingFile(path.display().to_string()));
            }
            figment = figment.merge(Yaml::file(path));
        }
        let config: AppConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|err| ConfigError::Extract(Box::new(err)))?;
        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.message_window == 0 {
            return Err(ConfigError::InvalidEngineConfig(
                "message_window must be greater than 0".to_string(),
            ));
        }

        if self.engine.default_display_name.trim().is_empty() {
            return Err(ConfigError::InvalidEngineConfig(
                "default_display_name cannot be empty".to_string(),
            ));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::InvalidLoggingConfig(
                "filter cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    MissingFile(String),
    #[error("Failed to extract configuration: {0}")]
    Extract(#[source] Box<figment::Error>),
    #[error("Invalid engine configuration: {0}")]
    InvalidEngineConfig(String),
    #[error("Invalid logging configuration: {0}")]
    InvalidLoggingConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.engine.message_window, 100);
        assert_eq!(config.engine.default_display_name, "User");
        assert_eq!(config.store.simulated_latency_ms, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("PETSYNC_ENGINE__MESSAGE_WINDOW", "25");
            jail.set_env("PETSYNC_LOGGING__FILTER", "debug");

            let config = AppConfig::load(None).expect("config");
            assert_eq!(config.engine.message_window, 25);
            assert_eq!(config.logging.filter, "debug");
            assert_eq!(config.engine.default_display_name, "User");
            Ok(())
        });
    }

    #[test]
    fn test_yaml_file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "petsync.yaml",
                r#"
engine:
  message_window: 40
  default_display_name: "Pet Lover"
store:
  simulated_latency_ms: 5
"#,
            )?;
            jail.set_env("PETSYNC_STORE__SIMULATED_LATENCY_MS", "7");

            let config = AppConfig::load(Some(Path::new("petsync.yaml"))).expect("config");
            assert_eq!(config.engine.message_window, 40);
            assert_eq!(config.engine.default_display_name, "Pet Lover");
            assert_eq!(config.store.simulated_latency_ms, 7);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/definitely/not/here.yaml")));
        assert!(matches!(result, Err(ConfigError::MissingFile(_))));
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();

        config.engine.message_window = 0;
        assert!(config.validate().is_err());

        config.engine.message_window = 10;
        config.engine.default_display_name = "   ".to_string();
        assert!(config.validate().is_err());

        config.engine.default_display_name = "User".to_string();
        config.logging.filter = String::new();
        assert!(config.validate().is_err());
    }
}
