//! HTTP Scheduler Client - 远程 process_next 客户端
//!
//! 实现 ProcessNextPort，轮询驱动器跨进程调用服务端调度器时使用。
//! 传输层错误映射为 SchedulerError::Transport，驱动器据此放慢节奏。

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use crate::application::ports::{ProcessNextPort, ProcessOutcome, SchedulerError};

/// HTTP Scheduler Client 配置
#[derive(Debug, Clone)]
pub struct HttpSchedulerClientConfig {
    /// Narra 服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpSchedulerClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5070".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    errno: i32,
    error: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ProcessNextData {
    done: bool,
    processing: Option<ProcessingPairData>,
}

#[derive(Debug, Deserialize)]
struct ProcessingPairData {
    content_id: Uuid,
    voice: String,
}

/// 远程调度客户端
pub struct HttpSchedulerClient {
    client: Client,
    config: HttpSchedulerClientConfig,
}

impl HttpSchedulerClient {
    pub fn new(config: HttpSchedulerClientConfig) -> Result<Self, SchedulerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SchedulerError::Transport(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl ProcessNextPort for HttpSchedulerClient {
    async fn process_next(&self) -> Result<ProcessOutcome, SchedulerError> {
        let response = self
            .client
            .post(format!("{}/api/process_next", self.config.base_url))
            .send()
            .await
            .map_err(|e| SchedulerError::Transport(e.to_string()))?;

        let envelope: Envelope<ProcessNextData> = response
            .json()
            .await
            .map_err(|e| SchedulerError::Transport(e.to_string()))?;

        if envelope.errno != 0 {
            return Err(SchedulerError::Internal(format!(
                "errno {}: {}",
                envelope.errno, envelope.error
            )));
        }

        let data = envelope
            .data
            .ok_or_else(|| SchedulerError::Internal("empty response data".to_string()))?;

        match (data.done, data.processing) {
            (true, _) => Ok(ProcessOutcome::Done),
            (false, Some(pair)) => Ok(ProcessOutcome::Processing {
                content_id: pair.content_id,
                voice_name: pair.voice,
            }),
            (false, None) => Err(SchedulerError::Internal(
                "process_next response missing processing pair".to_string(),
            )),
        }
    }
}
