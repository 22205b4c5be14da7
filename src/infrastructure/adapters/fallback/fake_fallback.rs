//! Fake Fallback Speech - 用于测试的设备端合成
//!
//! 模拟宿主合成引擎的事件流：Started，固定时长后 Ended。
//! 可配置为直接不可用或播报失败，覆盖回退路径的错误分支。

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::application::ports::{
    FallbackControl, FallbackError, FallbackEvent, FallbackPlayback, FallbackSpeechPort,
};

/// Fake Fallback 配置
#[derive(Debug, Clone)]
pub struct FakeFallbackConfig {
    /// 模拟的整段播报时长
    pub speak_duration: Duration,
    /// 模拟宿主没有可用合成器
    pub unsupported: bool,
    /// 播报中途上抛引擎错误
    pub fail_mid_speech: bool,
}

impl Default for FakeFallbackConfig {
    fn default() -> Self {
        Self {
            speak_duration: Duration::from_millis(150),
            unsupported: false,
            fail_mid_speech: false,
        }
    }
}

struct FakeFallbackControl {
    stopped: Arc<AtomicBool>,
}

impl FallbackControl for FakeFallbackControl {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Fake Fallback Speech
pub struct FakeFallbackSpeech {
    config: FakeFallbackConfig,
}

impl FakeFallbackSpeech {
    pub fn new(config: FakeFallbackConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(FakeFallbackConfig::default())
    }
}

#[async_trait]
impl FallbackSpeechPort for FakeFallbackSpeech {
    async fn speak(&self, text: &str) -> Result<FallbackPlayback, FallbackError> {
        if self.config.unsupported {
            return Err(FallbackError::Unsupported(
                "no on-device synthesizer".to_string(),
            ));
        }

        tracing::debug!(text_len = text.len(), "FakeFallbackSpeech: speaking");

        let (events_tx, events_rx) = mpsc::channel(4);
        let stopped = Arc::new(AtomicBool::new(false));

        let duration = self.config.speak_duration;
        let fail_mid_speech = self.config.fail_mid_speech;
        let stopped_task = stopped.clone();

        tokio::spawn(async move {
            let _ = events_tx.send(FallbackEvent::Started).await;

            tokio::time::sleep(duration).await;
            if stopped_task.load(Ordering::SeqCst) {
                return;
            }

            if fail_mid_speech {
                let _ = events_tx
                    .send(FallbackEvent::Error("scripted engine error".to_string()))
                    .await;
            } else {
                let _ = events_tx.send(FallbackEvent::Ended).await;
            }
        });

        Ok(FallbackPlayback {
            control: Box::new(FakeFallbackControl { stopped }),
            events: events_rx,
        })
    }
}
