//! Chunk Store Port - 音频分块存储
//!
//! key = (content_id, voice_name, chunk_index)，value = 合成音频 + 创建时间。
//! 分块只追加、从不改写；索引允许存在空洞（生成中的正常瞬态）。
//! 幂等插入是整条管线唯一的并发安全机制：并发写同一 key 时
//! 恰好落库一行，落败方不报错。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Chunk Store 错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// 已存储的分块
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub content_id: Uuid,
    pub voice_name: String,
    pub chunk_index: u32,
    pub audio: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// 待写入的分块
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub content_id: Uuid,
    pub voice_name: String,
    pub chunk_index: u32,
    pub audio: Vec<u8>,
}

/// 幂等插入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// 本次调用写入了新行
    Inserted,
    /// key 已存在，未做任何写入
    AlreadyPresent,
}

/// Chunk Store Port
#[async_trait]
pub trait ChunkStorePort: Send + Sync {
    /// 指定 key 的分块是否已存在
    async fn exists(
        &self,
        content_id: Uuid,
        voice_name: &str,
        chunk_index: u32,
    ) -> Result<bool, StoreError>;

    /// (content, voice) 已存储的分块数
    async fn count(&self, content_id: Uuid, voice_name: &str) -> Result<u32, StoreError>;

    /// 按 chunk_index 升序返回全部分块
    async fn get_ordered(
        &self,
        content_id: Uuid,
        voice_name: &str,
    ) -> Result<Vec<ChunkRecord>, StoreError>;

    /// 幂等插入
    ///
    /// key 已存在时静默返回 AlreadyPresent，绝不向落败的写入方报错
    async fn insert_if_absent(&self, chunk: NewChunk) -> Result<InsertOutcome, StoreError>;
}
