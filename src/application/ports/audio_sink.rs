//! Audio Sink Port - 分块音频播放抽象
//!
//! load 解码一个分块并立即开始播放，返回控制句柄 + 播放结束信号。
//! 加载下一个分块之前必须先 release 上一个句柄，这是资源纪律，
//! 不是可选项。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Audio Sink 错误
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Device error: {0}")]
    DeviceError(String),
}

/// 当前分块的控制句柄
pub trait AudioControl: Send {
    fn pause(&mut self);

    fn resume(&mut self);

    /// 变速立即作用于当前音频资源
    fn set_rate(&mut self, rate: f32);

    /// 分块内播放进度 0.0..=1.0
    fn chunk_fraction(&self) -> f32;

    /// 释放底层音频资源；release 之后句柄不再可用
    fn release(&mut self);
}

/// 已加载并开始播放的分块
pub struct LoadedChunk {
    pub control: Box<dyn AudioControl>,
    /// 播放自然结束（Ok）或播放中出错（Err）时收到一条消息；
    /// release 后不再发送任何消息
    pub ended: mpsc::Receiver<Result<(), SinkError>>,
}

/// Audio Sink Port
#[async_trait]
pub trait AudioSinkPort: Send + Sync {
    async fn load(&self, audio: &[u8], rate: f32) -> Result<LoadedChunk, SinkError>;
}
