//! Narra - 长文本分块朗读（TTS）管线
//!
//! 架构设计: Ports & Adapters（六边形架构）
//!
//! 领域层 (domain/):
//! - ChunkSplitter: 纯函数文本分块（断句 + 贪心累积）
//!
//! 应用层 (application/):
//! - Ports: 端口定义（ChunkStore, Repositories, SpeechProvider,
//!   ChunkSource, ProcessNext, AudioSink, FallbackSpeech）
//! - Generation: ChunkGenerator（重试/退避/限速）、
//!   GenerationDispatcher（派发即返回）、PregenScheduler（process_next）
//!
//! 客户端层 (client/):
//! - PollingDriver: 自适应退避的轮询驱动器
//! - PlaybackEngine: 分块播放状态机（自动续播、回退合成）
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API (axum)
//! - Persistence: SQLite 分块/正文/音色存储
//! - Memory: DashMap 内存实现（测试与内嵌场景）
//! - Adapters: Speech Provider Client, Chunk Source, Sink, Fallback

pub mod application;
pub mod client;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
