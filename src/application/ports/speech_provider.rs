//! Speech Provider Port - 语音合成服务抽象
//!
//! 一个刻意收窄的接口：synthesize(text, voice) -> 音频 | 限流。
//! 管线本身与具体供应商无关，每个供应商一个 adapter。

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Speech Provider 错误
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 凭据缺失或无效，对整次生成调用是致命错误
    #[error("Missing or invalid credentials: {0}")]
    MissingCredentials(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// 是否为致命错误（不可通过重试恢复，整次生成调用应立即失败）
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProviderError::MissingCredentials(_))
    }
}

/// 合成请求
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// 要合成的分块文本
    pub text: String,
    /// 音色名（供应商目录中的不透明标识）
    pub voice_name: String,
}

/// 合成成功返回的音频
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub audio: Vec<u8>,
    pub duration_ms: Option<u64>,
}

/// 单次合成调用的结果
#[derive(Debug, Clone)]
pub enum SynthesisOutcome {
    Audio(SynthesizedAudio),
    /// 供应商限流；retry_after 为服务端建议的等待时长
    Throttled { retry_after: Option<Duration> },
}

/// Speech Provider Port
#[async_trait]
pub trait SpeechProviderPort: Send + Sync {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisOutcome, ProviderError>;

    /// 检查合成服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
