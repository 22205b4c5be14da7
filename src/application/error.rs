//! 应用层错误定义

use thiserror::Error;
use uuid::Uuid;

use super::ports::{RepositoryError, StoreError};

/// 分块生成错误
///
/// 单个分块的瞬态失败不会出现在这里：生成器在分块粒度上
/// 重试后跳过，整次调用继续。这里只有让整次调用失败的错误。
#[derive(Debug, Error)]
pub enum GenerationError {
    /// 找不到正文，也没有兜底文本
    #[error("Content not found: {0}")]
    ContentNotFound(Uuid),

    /// 供应商配置错误（凭据缺失等），立即上抛
    #[error("Provider configuration error: {0}")]
    Configuration(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Repository error: {0}")]
    Repository(String),
}

impl From<StoreError> for GenerationError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<RepositoryError> for GenerationError {
    fn from(err: RepositoryError) -> Self {
        Self::Repository(err.to_string())
    }
}
