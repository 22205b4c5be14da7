//! 内存实现
//!
//! DashMap 实现的存储与目录，用于测试和内嵌（单进程客户端）场景

mod chunk_store;
mod content_repository;
mod voice_catalog;

pub use chunk_store::InMemoryChunkStore;
pub use content_repository::InMemoryContentRepository;
pub use voice_catalog::InMemoryVoiceCatalog;
