//! Process Next Port - 预生成调度入口抽象
//!
//! 每次调用做一个有界工作单元：找到窗口内第一个生成不完整的
//! (content, voice) 对并派发生成，或报告全部生成完毕。
//! 轮询驱动器只依赖该端口，本地调度器和远程 HTTP 客户端都实现它。

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// 调度错误
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// 单次 process_next 调用的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// 已为该对派发一次后台生成（不等待完成）
    Processing {
        content_id: Uuid,
        voice_name: String,
    },
    /// 扫描窗口内的所有 (content, voice) 对均已生成完毕
    Done,
}

/// Process Next Port
///
/// 允许并发调用自身：正确性完全依赖 ChunkStore 的幂等插入，
/// 不依赖互斥
#[async_trait]
pub trait ProcessNextPort: Send + Sync {
    async fn process_next(&self) -> Result<ProcessOutcome, SchedulerError>;
}
