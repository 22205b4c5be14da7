//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 语音合成供应商配置
    #[serde(default)]
    pub provider: ProviderConfig,

    /// 分块配置
    #[serde(default)]
    pub splitter: SplitterConfig,

    /// 预生成调度配置
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 公开访问的 Base URL（远程客户端使用）
    /// 如果未设置，则使用 http://{host}:{port}
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5070
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 获取公开的 Base URL
    pub fn public_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            let host = if self.host == "0.0.0.0" {
                "localhost"
            } else {
                &self.host
            };
            format!("http://{}:{}", host, self.port)
        })
    }
}

/// 语音合成供应商配置
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// 合成服务基础 URL
    #[serde(default = "default_provider_url")]
    pub url: String,

    /// API 凭据；缺失时生成调用立即失败
    #[serde(default)]
    pub api_key: Option<String>,

    /// 请求超时时间（秒）
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,

    /// 单个分块的最大合成尝试次数
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// 限流且无服务端建议值时的默认退避（毫秒）
    #[serde(default = "default_backoff_ms")]
    pub default_backoff_ms: u64,

    /// 相邻合成调用之间的强制间隔（毫秒）
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

fn default_provider_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_provider_timeout() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    2000
}

fn default_pacing_ms() -> u64 {
    250
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: default_provider_url(),
            api_key: None,
            timeout_secs: default_provider_timeout(),
            max_attempts: default_max_attempts(),
            default_backoff_ms: default_backoff_ms(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

/// 分块配置
#[derive(Debug, Clone, Deserialize)]
pub struct SplitterConfig {
    /// 单个分块的最大字符数
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
}

fn default_max_chunk_chars() -> usize {
    2000
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
        }
    }
}

/// 预生成调度配置
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// 每次 process_next 扫描的最近正文条数
    #[serde(default = "default_window_size")]
    pub window_size: u32,
}

fn default_window_size() -> u32 {
    20
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/narra.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5070);
        assert_eq!(config.provider.url, "http://localhost:8000");
        assert_eq!(config.provider.max_attempts, 3);
        assert_eq!(config.splitter.max_chunk_chars, 2000);
        assert_eq!(config.scheduler.window_size, 20);
        assert_eq!(config.database.path, "data/narra.db");
    }

    #[test]
    fn test_server_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:5070");
    }

    #[test]
    fn test_public_base_url_falls_back_to_localhost() {
        let config = ServerConfig::default();
        assert_eq!(config.public_base_url(), "http://localhost:5070");

        let config = ServerConfig {
            base_url: Some("https://narra.example.com".to_string()),
            ..ServerConfig::default()
        };
        assert_eq!(config.public_base_url(), "https://narra.example.com");
    }

    #[test]
    fn test_database_url() {
        let config = DatabaseConfig::default();
        assert_eq!(config.database_url(), "sqlite:data/narra.db?mode=rwc");
    }
}
