//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `NARRA_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `NARRA_SERVER__PORT=8080`
/// - `NARRA_PROVIDER__URL=http://tts-provider:8000`
/// - `NARRA_PROVIDER__API_KEY=sk-...`
/// - `NARRA_DATABASE__PATH=/data/narra.db`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5070)?
        .set_default("provider.url", "http://localhost:8000")?
        .set_default("provider.timeout_secs", 60)?
        .set_default("provider.max_attempts", 3)?
        .set_default("provider.default_backoff_ms", 2000)?
        .set_default("provider.pacing_ms", 250)?
        .set_default("splitter.max_chunk_chars", 2000)?
        .set_default("scheduler.window_size", 20)?
        .set_default("database.path", "data/narra.db")?
        .set_default("database.max_connections", 5)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        // 搜索默认配置文件
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 前缀: NARRA_
    // 层级分隔符: __ (双下划线)
    // 例如: NARRA_PROVIDER__URL=http://tts-provider:8000
    builder = builder.add_source(
        Environment::with_prefix("NARRA")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. 构建配置
    let config = builder.build()?;

    // 5. 反序列化为 AppConfig
    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))?;

    // 6. 验证配置
    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.provider.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "Provider URL cannot be empty".to_string(),
        ));
    }

    if config.provider.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "Provider max_attempts must be at least 1".to_string(),
        ));
    }

    if config.splitter.max_chunk_chars == 0 {
        return Err(ConfigError::ValidationError(
            "Splitter max_chunk_chars cannot be 0".to_string(),
        ));
    }

    if config.scheduler.window_size == 0 {
        return Err(ConfigError::ValidationError(
            "Scheduler window_size cannot be 0".to_string(),
        ));
    }

    if config.database.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("Public Base URL: {}", config.server.public_base_url());
    tracing::info!("Provider URL: {}", config.provider.url);
    tracing::info!(
        "Provider API Key: {}",
        if config.provider.api_key.is_some() {
            "configured"
        } else {
            "MISSING"
        }
    );
    tracing::info!("Provider Timeout: {}s", config.provider.timeout_secs);
    tracing::info!("Provider Max Attempts: {}", config.provider.max_attempts);
    tracing::info!("Provider Pacing: {}ms", config.provider.pacing_ms);
    tracing::info!("Max Chunk Chars: {}", config.splitter.max_chunk_chars);
    tracing::info!("Scheduler Window: {}", config.scheduler.window_size);
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5070);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
port = 6080

[provider]
url = "http://tts.internal:9000"
api_key = "test-key"

[splitter]
max_chunk_chars = 1500
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.server.port, 6080);
        assert_eq!(config.provider.url, "http://tts.internal:9000");
        assert_eq!(config.provider.api_key.as_deref(), Some("test-key"));
        assert_eq!(config.splitter.max_chunk_chars, 1500);
        // 未覆盖的字段回落到默认值
        assert_eq!(config.database.path, "data/narra.db");
        assert_eq!(config.scheduler.window_size, 20);
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_provider_url() {
        let mut config = AppConfig::default();
        config.provider.url = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_chunk_chars() {
        let mut config = AppConfig::default();
        config.splitter.max_chunk_chars = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_attempts() {
        let mut config = AppConfig::default();
        config.provider.max_attempts = 0;
        assert!(validate_config(&config).is_err());
    }
}
