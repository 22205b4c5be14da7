//! 客户端层
//!
//! - PollingDriver: 反复调用 process_next 的自适应轮询驱动器
//! - Playback: 分块播放引擎与会话状态

pub mod playback;
pub mod polling_driver;

pub use playback::{
    EngineConfig, PlaybackEngine, PlaybackEvent, PlaybackSession, PlaybackState, PlayRequest,
};
pub use polling_driver::{DriverConfig, PollingDriver, TickResult};
