//! Repository Ports - 出站端口
//!
//! 正文与音色目录的持久化抽象。两者都由上游系统拥有，
//! 本管线只做读取（正文）和登记（音色目录）。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// ============================================================================
// Content Repository
// ============================================================================

/// 待朗读的长文本（上游产出，对本管线只读）
#[derive(Debug, Clone)]
pub struct ContentRecord {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentRecord {
    pub fn new(id: Uuid, title: impl Into<String>, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            body: body.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Content Repository Port
#[async_trait]
pub trait ContentRepositoryPort: Send + Sync {
    /// 写入或更新正文（上游生产者边界）
    async fn upsert(&self, content: &ContentRecord) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentRecord>, RepositoryError>;

    /// 按创建时间倒序返回最近的正文（调度器扫描窗口）
    async fn find_recent(&self, limit: u32) -> Result<Vec<ContentRecord>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<ContentRecord>, RepositoryError>;
}

// ============================================================================
// Voice Catalog
// ============================================================================

/// 音色档案
///
/// 对管线而言是不透明标识：name 是持久化 key，
/// locale/gender 只是目录元数据
#[derive(Debug, Clone)]
pub struct VoiceProfile {
    pub name: String,
    pub locale: String,
    pub gender: String,
}

/// Voice Catalog Port
#[async_trait]
pub trait VoiceCatalogPort: Send + Sync {
    async fn upsert(&self, voice: &VoiceProfile) -> Result<(), RepositoryError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<VoiceProfile>, RepositoryError>;

    /// 全部已知音色（调度器为每个音色核对生成进度）
    async fn list(&self) -> Result<Vec<VoiceProfile>, RepositoryError>;
}
