//! Audio Sink 适配器

mod timer_sink;

pub use timer_sink::{TimerAudioSink, TimerSinkConfig};
