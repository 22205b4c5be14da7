//! Timer Audio Sink - 按墙钟时间模拟播放的音频输出
//!
//! 不驱动真实音频设备：按字节率把分块长度折算成播放时长，
//! 用定时任务推进进度并在播完时发出结束信号。支持暂停、
//! 变速和释放，行为与真实输出一致，用于测试与无声环境。

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::application::ports::{AudioControl, AudioSinkPort, LoadedChunk, SinkError};

/// Timer Sink 配置
#[derive(Debug, Clone)]
pub struct TimerSinkConfig {
    /// 折算播放时长用的字节率（字节/秒）
    pub bytes_per_second: f64,
    /// 进度推进的步长
    pub tick: Duration,
}

impl Default for TimerSinkConfig {
    fn default() -> Self {
        Self {
            bytes_per_second: 32_000.0,
            tick: Duration::from_millis(5),
        }
    }
}

/// 单个分块的共享播放状态
struct TimerChunkState {
    paused: AtomicBool,
    released: AtomicBool,
    /// 速率以千分率存储（1.0 -> 1000）
    rate_millis: AtomicU32,
    played_micros: AtomicU64,
    duration_micros: u64,
}

/// 模拟播放的控制句柄
struct TimerControl {
    state: Arc<TimerChunkState>,
}

impl AudioControl for TimerControl {
    fn pause(&mut self) {
        self.state.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&mut self) {
        self.state.paused.store(false, Ordering::SeqCst);
    }

    fn set_rate(&mut self, rate: f32) {
        let clamped = rate.clamp(0.25, 4.0);
        self.state
            .rate_millis
            .store((clamped * 1000.0) as u32, Ordering::SeqCst);
    }

    fn chunk_fraction(&self) -> f32 {
        let played = self.state.played_micros.load(Ordering::SeqCst) as f64;
        (played / self.state.duration_micros as f64).min(1.0) as f32
    }

    fn release(&mut self) {
        self.state.released.store(true, Ordering::SeqCst);
    }
}

/// 按墙钟推进播放进度，播完发出结束信号
async fn drive(
    state: Arc<TimerChunkState>,
    tick: Duration,
    ended: mpsc::Sender<Result<(), SinkError>>,
) {
    loop {
        tokio::time::sleep(tick).await;

        if state.released.load(Ordering::SeqCst) {
            return;
        }
        if state.paused.load(Ordering::SeqCst) {
            continue;
        }

        let rate = state.rate_millis.load(Ordering::SeqCst) as f64 / 1000.0;
        let step = (tick.as_micros() as f64 * rate) as u64;
        let played = state.played_micros.fetch_add(step, Ordering::SeqCst) + step;

        if played >= state.duration_micros {
            let _ = ended.send(Ok(())).await;
            return;
        }
    }
}

/// 模拟时钟音频输出
pub struct TimerAudioSink {
    config: TimerSinkConfig,
}

impl TimerAudioSink {
    pub fn new(config: TimerSinkConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(TimerSinkConfig::default())
    }
}

#[async_trait]
impl AudioSinkPort for TimerAudioSink {
    async fn load(&self, audio: &[u8], rate: f32) -> Result<LoadedChunk, SinkError> {
        if audio.is_empty() {
            return Err(SinkError::DecodeError("empty audio chunk".to_string()));
        }

        let duration_secs = audio.len() as f64 / self.config.bytes_per_second;
        let state = Arc::new(TimerChunkState {
            paused: AtomicBool::new(false),
            released: AtomicBool::new(false),
            rate_millis: AtomicU32::new((rate.clamp(0.25, 4.0) * 1000.0) as u32),
            played_micros: AtomicU64::new(0),
            duration_micros: (duration_secs * 1_000_000.0).max(1.0) as u64,
        });

        let (ended_tx, ended_rx) = mpsc::channel(1);
        tokio::spawn(drive(state.clone(), self.config.tick, ended_tx));

        Ok(LoadedChunk {
            control: Box::new(TimerControl { state }),
            ended: ended_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_sink() -> TimerAudioSink {
        // 100 字节 ≈ 20ms
        TimerAudioSink::new(TimerSinkConfig {
            bytes_per_second: 5_000.0,
            tick: Duration::from_millis(2),
        })
    }

    #[tokio::test]
    async fn test_chunk_plays_to_end() {
        let sink = fast_sink();
        let mut loaded = sink.load(&[0u8; 100], 1.0).await.unwrap();

        let ended = tokio::time::timeout(Duration::from_secs(1), loaded.ended.recv())
            .await
            .expect("chunk did not end in time");
        assert!(matches!(ended, Some(Ok(()))));
        assert!(loaded.control.chunk_fraction() >= 0.99);
    }

    #[tokio::test]
    async fn test_empty_audio_fails_to_load() {
        let sink = fast_sink();
        assert!(matches!(
            sink.load(&[], 1.0).await,
            Err(SinkError::DecodeError(_))
        ));
    }

    #[tokio::test]
    async fn test_pause_freezes_progress() {
        let sink = fast_sink();
        let mut loaded = sink.load(&[0u8; 2_000], 1.0).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        loaded.control.pause();
        // 让暂停前已在途的最后一步落地
        tokio::time::sleep(Duration::from_millis(10)).await;
        let at_pause = loaded.control.chunk_fraction();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(loaded.control.chunk_fraction(), at_pause);
        loaded.control.release();
    }

    #[tokio::test]
    async fn test_release_stops_end_signal() {
        let sink = fast_sink();
        let mut loaded = sink.load(&[0u8; 50], 1.0).await.unwrap();
        loaded.control.release();

        // 释放后不再有结束信号，通道直接关闭
        let ended = tokio::time::timeout(Duration::from_millis(200), loaded.ended.recv())
            .await
            .expect("channel should close after release");
        assert!(ended.is_none());
    }

    #[tokio::test]
    async fn test_higher_rate_finishes_sooner() {
        let sink = fast_sink();
        let mut slow = sink.load(&[0u8; 300], 1.0).await.unwrap();
        let mut fast = sink.load(&[0u8; 300], 2.0).await.unwrap();

        let fast_end = tokio::time::timeout(Duration::from_secs(1), fast.ended.recv()).await;
        assert!(fast_end.is_ok());
        // 2x 速率播完时 1x 还没播完
        assert!(slow.control.chunk_fraction() < 1.0);
        slow.control.release();
    }
}
