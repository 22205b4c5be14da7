//! HTTP Speech Client - 调用外部语音合成服务
//!
//! 实现 SpeechProviderPort trait，通过 HTTP 调用外部合成服务
//!
//! 外部合成 API:
//! POST {base_url}/v1/synthesize
//! Request: {"text": "...", "voice": "..."}  (JSON, Bearer 凭据)
//! Response: 二进制音频；429 表示限流，Retry-After 给出建议等待秒数

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

use crate::application::ports::{
    ProviderError, SpeechProviderPort, SynthesisOutcome, SynthesisRequest, SynthesizedAudio,
};

/// 合成请求体 (JSON)
#[derive(Debug, Serialize)]
struct SynthesizeHttpRequest {
    text: String,
    voice: String,
}

/// HTTP Speech 客户端配置
#[derive(Debug, Clone)]
pub struct HttpSpeechClientConfig {
    /// 合成服务基础 URL
    pub base_url: String,
    /// API 凭据；缺失时 synthesize 立即报致命错误
    pub api_key: Option<String>,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpSpeechClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl HttpSpeechClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP Speech 客户端
pub struct HttpSpeechClient {
    client: Client,
    config: HttpSpeechClientConfig,
}

impl HttpSpeechClient {
    pub fn new(config: HttpSpeechClientConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn synthesize_url(&self) -> String {
        format!("{}/v1/synthesize", self.config.base_url)
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url)
    }

    /// 解析 Retry-After 响应头（秒）
    fn retry_after(response: &reqwest::Response) -> Option<Duration> {
        response
            .headers()
            .get(http::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

#[async_trait]
impl SpeechProviderPort for HttpSpeechClient {
    async fn synthesize(
        &self,
        request: SynthesisRequest,
    ) -> Result<SynthesisOutcome, ProviderError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ProviderError::MissingCredentials("speech provider api_key not configured".to_string())
        })?;

        let http_request = SynthesizeHttpRequest {
            text: request.text,
            voice: request.voice_name,
        };

        tracing::debug!(
            url = %self.synthesize_url(),
            text_len = http_request.text.len(),
            voice = %http_request.voice,
            "Sending synthesize request"
        );

        let response = self
            .client
            .post(self.synthesize_url())
            .bearer_auth(api_key)
            .json(&http_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else if e.is_connect() {
                    ProviderError::NetworkError(format!(
                        "Cannot connect to speech provider: {}",
                        e
                    ))
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = Self::retry_after(&response);
            tracing::debug!(
                voice = %http_request.voice,
                retry_after_secs = retry_after.map(|d| d.as_secs()),
                "Provider throttled request"
            );
            return Ok(SynthesisOutcome::Throttled { retry_after });
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::MissingCredentials(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        // 从 headers 提取时长元数据
        let duration_ms = response
            .headers()
            .get("X-Speech-Duration-Ms")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());

        let audio = response
            .bytes()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to read audio: {}", e)))?
            .to_vec();

        if audio.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "Provider returned empty audio body".to_string(),
            ));
        }

        tracing::info!(
            voice = %http_request.voice,
            duration_ms = ?duration_ms,
            audio_size = audio.len(),
            "Synthesis completed"
        );

        Ok(SynthesisOutcome::Audio(SynthesizedAudio {
            audio,
            duration_ms,
        }))
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
