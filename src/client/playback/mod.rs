//! 分块播放
//!
//! PlaybackEngine 把有序分块缝合成连续、可跳转、可续播的音频流，
//! 分块未就绪时退回设备端合成。

mod engine;
mod session;

pub use engine::{EngineConfig, PlayRequest, PlaybackEngine, PlaybackEvent, PlaybackState};
pub use session::PlaybackSession;
