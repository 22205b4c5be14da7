//! Fallback Speech Port - 设备端回退合成抽象
//!
//! 服务端分块未就绪时，对整段原文做设备端连续合成。
//! 宿主引擎只给出 start/end/error 事件，没有原生进度信号，
//! 也不支持 seek；进度由播放引擎按词数估算。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Fallback Speech 错误
#[derive(Debug, Error)]
pub enum FallbackError {
    /// 宿主没有可用的设备端合成器
    #[error("Fallback synthesizer unsupported: {0}")]
    Unsupported(String),

    #[error("Engine error: {0}")]
    EngineError(String),
}

/// 宿主合成引擎上抛的事件
#[derive(Debug, Clone)]
pub enum FallbackEvent {
    Started,
    Ended,
    Error(String),
}

/// 进行中的回退合成控制句柄
pub trait FallbackControl: Send {
    /// 中止合成并释放引擎；之后不再有事件
    fn stop(&mut self);
}

/// 已启动的回退合成
pub struct FallbackPlayback {
    pub control: Box<dyn FallbackControl>,
    pub events: mpsc::Receiver<FallbackEvent>,
}

/// Fallback Speech Port
#[async_trait]
pub trait FallbackSpeechPort: Send + Sync {
    async fn speak(&self, text: &str) -> Result<FallbackPlayback, FallbackError>;
}
