//! Polling Driver - 预生成轮询驱动器
//!
//! 持有一个定时循环，反复调用 ProcessNextPort 并按结果自适应调节
//! 间隔：Processing 维持基线；错误按约 2 倍放宽（有上限、不低于
//! 基线）；Done 切到分钟级的空闲间隔。首次触发刻意延后，避免与
//! 前台工作争抢。
//!
//! 单个驱动器实例的循环在上一次调用返回前不会再次触发，天然不会
//! 重叠调度请求；多个独立实例并发争抢同一 (content, voice) 对是
//! 允许的，由存储层幂等插入兜底。
//!
//! stop() 取消挂起的定时器并让循环归于惰性；start()/stop() 均幂等。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::application::ports::{ProcessNextPort, ProcessOutcome};

/// 驱动器配置
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// 启动后首次触发的延迟
    pub initial_delay: Duration,
    /// 基线轮询间隔
    pub base_interval: Duration,
    /// 错误退避的上限
    pub max_backoff: Duration,
    /// 语料全部生成完毕后的空闲间隔
    pub idle_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            base_interval: Duration::from_secs(15),
            max_backoff: Duration::from_secs(120),
            idle_interval: Duration::from_secs(300),
        }
    }
}

/// 单次调度调用的分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    /// 调度器派发了新工作
    Processing,
    /// 扫描窗口已全部生成完毕
    Done,
    /// 传输或服务端错误
    Error,
}

/// 根据本次结果计算下一次轮询间隔
///
/// 错误永远只意味着"放慢"，从不停止：瞬态条件解除后积压
/// 会被逐步清空
pub fn next_interval(config: &DriverConfig, current: Duration, result: TickResult) -> Duration {
    match result {
        TickResult::Processing => config.base_interval,
        TickResult::Done => config.idle_interval,
        TickResult::Error => (current * 2).clamp(config.base_interval, config.max_backoff),
    }
}

struct DriverHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// 轮询驱动器
pub struct PollingDriver {
    config: DriverConfig,
    scheduler: Arc<dyn ProcessNextPort>,
    handle: Mutex<Option<DriverHandle>>,
}

impl PollingDriver {
    pub fn new(config: DriverConfig, scheduler: Arc<dyn ProcessNextPort>) -> Self {
        Self {
            config,
            scheduler,
            handle: Mutex::new(None),
        }
    }

    /// 启动轮询循环；已在运行时为无操作
    pub fn start(&self) {
        let mut guard = self.handle.lock().unwrap();

        if let Some(handle) = guard.as_ref() {
            if !handle.task.is_finished() {
                tracing::debug!("Polling driver already running");
                return;
            }
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(
            self.config.clone(),
            self.scheduler.clone(),
            shutdown_rx,
        ));

        *guard = Some(DriverHandle {
            shutdown: shutdown_tx,
            task,
        });

        tracing::info!(
            initial_delay_ms = self.config.initial_delay.as_millis() as u64,
            base_interval_ms = self.config.base_interval.as_millis() as u64,
            "Polling driver started"
        );
    }

    /// 停止轮询循环：取消挂起的定时器，已在停止状态时为无操作
    pub fn stop(&self) {
        let mut guard = self.handle.lock().unwrap();

        if let Some(handle) = guard.take() {
            let _ = handle.shutdown.send(true);
            tracing::info!("Polling driver stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap()
            .as_ref()
            .map(|h| !h.task.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for PollingDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop(
    config: DriverConfig,
    scheduler: Arc<dyn ProcessNextPort>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut delay = config.initial_delay;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        // 定时器醒来与停止之间的竞态：醒来后再确认一次
        if *shutdown.borrow() {
            break;
        }

        let tick = match scheduler.process_next().await {
            Ok(ProcessOutcome::Processing {
                content_id,
                voice_name,
            }) => {
                tracing::debug!(
                    content_id = %content_id,
                    voice = %voice_name,
                    "Pregen tick dispatched work"
                );
                TickResult::Processing
            }
            Ok(ProcessOutcome::Done) => {
                tracing::debug!("Pregen backlog drained, going idle");
                TickResult::Done
            }
            Err(e) => {
                tracing::warn!(error = %e, "process_next failed, widening interval");
                TickResult::Error
            }
        };

        delay = next_interval(&config, delay, tick);
    }

    tracing::debug!("Polling driver loop exited");
}
