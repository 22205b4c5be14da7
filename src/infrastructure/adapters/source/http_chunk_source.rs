//! HTTP Chunk Source - 远程分块来源
//!
//! 播放端与服务端分进程时使用：
//! POST /api/chunk/list 取元数据，GET /api/chunk/audio/... 取字节，
//! POST /api/generate 触发后台生成。

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::application::ports::{ChunkSourcePort, SourceChunk, SourceError};

/// 并发拉取音频的在途请求数
const AUDIO_FETCH_CONCURRENCY: usize = 4;

/// HTTP Chunk Source 配置
#[derive(Debug, Clone)]
pub struct HttpChunkSourceConfig {
    /// Narra 服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpChunkSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5070".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChunkListHttpRequest {
    content_id: Uuid,
    voice: String,
}

#[derive(Debug, Serialize)]
struct GenerateHttpRequest {
    content_id: Uuid,
    voice: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_text: Option<String>,
}

/// 服务端统一响应信封
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    errno: i32,
    error: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ChunkListData {
    chunks: Vec<ChunkMetaData>,
}

#[derive(Debug, Deserialize)]
struct ChunkMetaData {
    index: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateData {
    #[allow(dead_code)]
    status: String,
}

/// 远程分块来源
pub struct HttpChunkSource {
    client: Client,
    config: HttpChunkSourceConfig,
}

impl HttpChunkSource {
    pub fn new(config: HttpChunkSourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn map_send_error(e: reqwest::Error) -> SourceError {
        if e.is_connect() || e.is_timeout() {
            SourceError::NetworkError(e.to_string())
        } else {
            SourceError::ServiceError(e.to_string())
        }
    }

    fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T, SourceError> {
        if envelope.errno != 0 {
            if envelope.errno == 404 {
                return Err(SourceError::NotFound(envelope.error));
            }
            return Err(SourceError::ServiceError(format!(
                "errno {}: {}",
                envelope.errno, envelope.error
            )));
        }
        envelope
            .data
            .ok_or_else(|| SourceError::ServiceError("empty response data".to_string()))
    }

    async fn fetch_audio(
        &self,
        content_id: Uuid,
        voice_name: &str,
        index: u32,
    ) -> Result<SourceChunk, SourceError> {
        let url = format!(
            "{}/api/chunk/audio/{}/{}/{}",
            self.config.base_url, content_id, voice_name, index
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            return Err(SourceError::ServiceError(format!(
                "HTTP {} fetching chunk audio",
                response.status()
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SourceError::ServiceError(e.to_string()))?
            .to_vec();

        Ok(SourceChunk { index, audio })
    }
}

#[async_trait]
impl ChunkSourcePort for HttpChunkSource {
    async fn get_chunks(
        &self,
        content_id: Uuid,
        voice_name: &str,
    ) -> Result<Vec<SourceChunk>, SourceError> {
        let response = self
            .client
            .post(format!("{}/api/chunk/list", self.config.base_url))
            .json(&ChunkListHttpRequest {
                content_id,
                voice: voice_name.to_string(),
            })
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let envelope: Envelope<ChunkListData> = response
            .json()
            .await
            .map_err(|e| SourceError::ServiceError(e.to_string()))?;
        let data = Self::unwrap_envelope(envelope)?;

        // 保持索引顺序地并发拉取音频字节
        let chunks: Vec<SourceChunk> = stream::iter(data.chunks)
            .map(|meta| self.fetch_audio(content_id, voice_name, meta.index))
            .buffered(AUDIO_FETCH_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(chunks)
    }

    async fn request_generation(
        &self,
        content_id: Uuid,
        voice_name: &str,
        raw_text: Option<&str>,
    ) -> Result<(), SourceError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.config.base_url))
            .json(&GenerateHttpRequest {
                content_id,
                voice: voice_name.to_string(),
                raw_text: raw_text.map(str::to_string),
            })
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let envelope: Envelope<GenerateData> = response
            .json()
            .await
            .map_err(|e| SourceError::ServiceError(e.to_string()))?;
        Self::unwrap_envelope(envelope).map(|_| ())
    }
}
