//! Chunk Source Port - 播放端读取分块的抽象
//!
//! 播放引擎通过该端口取分块、并在分块缺失时请求后台生成。
//! 本地实现直接读 ChunkStore，远程实现走 HTTP API，
//! 引擎对两者无感知。

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Chunk Source 错误
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Content not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// 播放端看到的分块
#[derive(Debug, Clone)]
pub struct SourceChunk {
    pub index: u32,
    pub audio: Vec<u8>,
}

/// Chunk Source Port
#[async_trait]
pub trait ChunkSourcePort: Send + Sync {
    /// 按索引升序返回 (content, voice) 的全部已生成分块
    ///
    /// 空列表是正常状态（生成尚未开始或尚未完成），不是错误
    async fn get_chunks(
        &self,
        content_id: Uuid,
        voice_name: &str,
    ) -> Result<Vec<SourceChunk>, SourceError>;

    /// 确保 (content, voice) 的后台生成已启动，立即返回
    ///
    /// raw_text 是正文仓储查不到时的兜底文本
    async fn request_generation(
        &self,
        content_id: Uuid,
        voice_name: &str,
        raw_text: Option<&str>,
    ) -> Result<(), SourceError>;
}
