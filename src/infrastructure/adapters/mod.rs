//! 基础设施适配器
//!
//! 出站端口的具体实现：语音合成供应商客户端、播放端分块来源、
//! 远程调度客户端、音频输出与设备端回退合成

pub mod fallback;
pub mod provider;
pub mod scheduler_client;
pub mod sink;
pub mod source;

pub use fallback::{FakeFallbackConfig, FakeFallbackSpeech};
pub use provider::{
    FakeSpeechClient, HttpSpeechClient, HttpSpeechClientConfig, ScriptedOutcome,
};
pub use scheduler_client::{HttpSchedulerClient, HttpSchedulerClientConfig};
pub use sink::{TimerAudioSink, TimerSinkConfig};
pub use source::{HttpChunkSource, HttpChunkSourceConfig, LocalChunkSource};
