//! Playback Engine - 分块播放引擎
//!
//! 命令通道驱动的状态机：把 (content, voice) 的有序分块缝合成
//! 连续音频流，支持暂停/续播、分块粒度跳转、变速与换音色；
//! 分块未就绪时触发后台生成并退回设备端合成。
//!
//! 状态: idle, loading, playing, paused, fallback-playing, completed, error
//!
//! 资源纪律：加载下一分块前必须释放上一分块的音频资源；
//! stop 与引擎退出在任何状态下都会释放资源。
//! 单个分块的解码/播放错误自动跳到下一分块，只有余下分块全部
//! 失败且无回退可用时才进入 error。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::application::ports::{
    AudioControl, AudioSinkPort, ChunkSourcePort, FallbackControl, FallbackEvent,
    FallbackSpeechPort, SinkError, SourceChunk,
};
use crate::client::playback::session::PlaybackSession;

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Paused,
    FallbackPlaying,
    Completed,
    Error,
}

/// 播放事件（进度与完成回调）
#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    StateChanged(PlaybackState),
    Progress { percent: f32, chunk_index: u32 },
    Completed,
    Error(String),
}

/// 播放请求
#[derive(Debug, Clone)]
pub struct PlayRequest {
    pub content_id: Uuid,
    pub voice_name: String,
    /// 正文兜底文本：分块缺失时交给后台生成与设备端回退
    pub raw_text: Option<String>,
    /// 续播起点；None 表示从分块 0 开始
    pub resume_index: Option<u32>,
}

/// 引擎配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 进度回调的发射间隔
    pub progress_interval: Duration,
    /// 回退进度估算用的语速（词/分钟）
    pub fallback_words_per_minute: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(200),
            fallback_words_per_minute: 160,
        }
    }
}

enum Command {
    Play(PlayRequest),
    Pause,
    Resume,
    Stop,
    SeekTo(u32),
    SkipForward,
    SkipBackward,
    SetRate(f32),
    ChangeVoice(String),
    Snapshot(oneshot::Sender<Option<PlaybackSession>>),
}

/// 播放引擎句柄
///
/// 实际状态机运行在独立任务中，句柄被 drop 时任务释放资源退出
pub struct PlaybackEngine {
    cmd_tx: mpsc::Sender<Command>,
    events: broadcast::Sender<PlaybackEvent>,
    state_rx: watch::Receiver<PlaybackState>,
}

impl PlaybackEngine {
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn ChunkSourcePort>,
        sink: Arc<dyn AudioSinkPort>,
        fallback: Option<Arc<dyn FallbackSpeechPort>>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (events, _) = broadcast::channel(256);
        let (state_tx, state_rx) = watch::channel(PlaybackState::Idle);

        let task = EngineTask {
            config,
            source,
            sink,
            fallback,
            cmd_rx,
            events: events.clone(),
            state_tx,
            state: PlaybackState::Idle,
            session: None,
            chunks: Vec::new(),
            raw_text: None,
            current: None,
            chunk_ended: None,
            fallback_ctl: None,
            fallback_events: None,
            fallback_started: None,
            fallback_est_secs: 0.0,
            rate: 1.0,
            last_progress: 0.0,
            completed_fired: false,
        };
        tokio::spawn(task.run());

        Self {
            cmd_tx,
            events,
            state_rx,
        }
    }

    /// 订阅播放事件
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// 当前播放状态
    pub fn state(&self) -> PlaybackState {
        *self.state_rx.borrow()
    }

    /// 状态变更监听
    pub fn state_watch(&self) -> watch::Receiver<PlaybackState> {
        self.state_rx.clone()
    }

    pub async fn play(&self, request: PlayRequest) {
        let _ = self.cmd_tx.send(Command::Play(request)).await;
    }

    pub async fn pause(&self) {
        let _ = self.cmd_tx.send(Command::Pause).await;
    }

    pub async fn resume(&self) {
        let _ = self.cmd_tx.send(Command::Resume).await;
    }

    pub async fn stop(&self) {
        let _ = self.cmd_tx.send(Command::Stop).await;
    }

    /// 跳到指定分块（分块粒度，不保证分块内定位）
    pub async fn seek_to(&self, chunk_index: u32) {
        let _ = self.cmd_tx.send(Command::SeekTo(chunk_index)).await;
    }

    pub async fn skip_forward(&self) {
        let _ = self.cmd_tx.send(Command::SkipForward).await;
    }

    pub async fn skip_backward(&self) {
        let _ = self.cmd_tx.send(Command::SkipBackward).await;
    }

    /// 变速，立即作用于当前音频并沿用到后续分块
    pub async fn set_rate(&self, rate: f32) {
        let _ = self.cmd_tx.send(Command::SetRate(rate)).await;
    }

    /// 换音色：作废已加载的分块集，从分块 0 重新加载
    pub async fn change_voice(&self, voice_name: impl Into<String>) {
        let _ = self
            .cmd_tx
            .send(Command::ChangeVoice(voice_name.into()))
            .await;
    }

    /// 当前会话快照；Idle 时为 None
    pub async fn session(&self) -> Option<PlaybackSession> {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Snapshot(tx)).await.is_err() {
            return None;
        }
        rx.await.ok().flatten()
    }
}

/// 引擎状态机任务
struct EngineTask {
    config: EngineConfig,
    source: Arc<dyn ChunkSourcePort>,
    sink: Arc<dyn AudioSinkPort>,
    fallback: Option<Arc<dyn FallbackSpeechPort>>,
    cmd_rx: mpsc::Receiver<Command>,
    events: broadcast::Sender<PlaybackEvent>,
    state_tx: watch::Sender<PlaybackState>,

    state: PlaybackState,
    session: Option<PlaybackSession>,
    chunks: Vec<SourceChunk>,
    raw_text: Option<String>,
    current: Option<Box<dyn AudioControl>>,
    chunk_ended: Option<mpsc::Receiver<Result<(), SinkError>>>,
    fallback_ctl: Option<Box<dyn FallbackControl>>,
    fallback_events: Option<mpsc::Receiver<FallbackEvent>>,
    fallback_started: Option<Instant>,
    fallback_est_secs: f64,
    rate: f32,
    last_progress: f32,
    completed_fired: bool,
}

/// 空槽位时挂起，避免空轮询
async fn recv_ended(
    slot: &mut Option<mpsc::Receiver<Result<(), SinkError>>>,
) -> Option<Result<(), SinkError>> {
    match slot.as_mut() {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn recv_fallback(slot: &mut Option<mpsc::Receiver<FallbackEvent>>) -> Option<FallbackEvent> {
    match slot.as_mut() {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// 按词数和假定语速估算整段播报时长（秒）
fn estimate_speech_secs(text: &str, words_per_minute: u32) -> f64 {
    let words = text.split_whitespace().count().max(1) as f64;
    words * 60.0 / words_per_minute.max(1) as f64
}

impl EngineTask {
    async fn run(mut self) {
        let mut progress_tick = tokio::time::interval(self.config.progress_interval);
        progress_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                maybe_cmd = self.cmd_rx.recv() => match maybe_cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    // 引擎句柄被 drop：退出并释放资源
                    None => break,
                },
                ended = recv_ended(&mut self.chunk_ended) => {
                    self.on_chunk_ended(ended).await;
                }
                event = recv_fallback(&mut self.fallback_events) => {
                    self.on_fallback_event(event);
                }
                _ = progress_tick.tick() => {
                    if matches!(self.state, PlaybackState::Playing | PlaybackState::FallbackPlaying) {
                        self.emit_progress();
                    }
                }
            }
        }

        self.release_all();
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Play(request) => self.handle_play(request).await,
            Command::Pause => self.handle_pause(),
            Command::Resume => self.handle_resume(),
            Command::Stop => self.handle_stop(),
            Command::SeekTo(index) => self.handle_seek(index).await,
            Command::SkipForward => self.handle_skip(1).await,
            Command::SkipBackward => self.handle_skip(-1).await,
            Command::SetRate(rate) => self.handle_set_rate(rate),
            Command::ChangeVoice(voice) => self.handle_change_voice(voice).await,
            Command::Snapshot(reply) => {
                let _ = reply.send(self.session.clone());
            }
        }
    }

    async fn handle_play(&mut self, request: PlayRequest) {
        self.release_all();
        self.completed_fired = false;
        self.last_progress = 0.0;
        self.raw_text = request.raw_text.clone();
        self.set_state(PlaybackState::Loading);

        match self
            .source
            .get_chunks(request.content_id, &request.voice_name)
            .await
        {
            Ok(chunks) if !chunks.is_empty() => {
                let total = chunks.len() as u32;
                self.chunks = chunks;
                self.session = Some(PlaybackSession::new(
                    request.content_id,
                    request.voice_name,
                    total,
                    self.rate,
                ));
                let start = request.resume_index.unwrap_or(0).min(total - 1);
                self.start_chunk(start).await;
            }
            Ok(_) => {
                // 分块未就绪：触发后台生成，转设备端回退
                if let Err(e) = self
                    .source
                    .request_generation(
                        request.content_id,
                        &request.voice_name,
                        self.raw_text.as_deref(),
                    )
                    .await
                {
                    tracing::warn!(error = %e, "Failed to request background generation");
                }
                self.chunks = Vec::new();
                self.session = Some(PlaybackSession::new(
                    request.content_id,
                    request.voice_name,
                    0,
                    self.rate,
                ));
                self.begin_fallback().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Chunk fetch failed, trying fallback");
                self.chunks = Vec::new();
                self.session = Some(PlaybackSession::new(
                    request.content_id,
                    request.voice_name,
                    0,
                    self.rate,
                ));
                self.begin_fallback().await;
            }
        }
    }

    /// 从 index 起加载分块；加载失败自动后移，余下全部失败时转回退
    async fn start_chunk(&mut self, index: u32) {
        self.release_all();
        let total = self.chunks.len() as u32;

        let mut i = index;
        while i < total {
            match self.sink.load(&self.chunks[i as usize].audio, self.rate).await {
                Ok(loaded) => {
                    self.current = Some(loaded.control);
                    self.chunk_ended = Some(loaded.ended);
                    if let Some(session) = self.session.as_mut() {
                        session.chunk_index = i;
                        session.chunk_fraction = 0.0;
                    }
                    self.set_state(PlaybackState::Playing);
                    self.emit_progress();
                    return;
                }
                Err(e) => {
                    tracing::warn!(chunk_index = i, error = %e, "Chunk failed to load, advancing");
                    i += 1;
                }
            }
        }

        self.begin_fallback().await;
    }

    async fn on_chunk_ended(&mut self, ended: Option<Result<(), SinkError>>) {
        self.chunk_ended = None;

        match ended {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Chunk playback error, advancing");
            }
            None => {
                tracing::warn!("Chunk end signal lost, advancing");
            }
        }

        let Some(session) = self.session.as_ref() else {
            return;
        };
        let index = session.chunk_index;
        let total = session.total_chunks;

        self.release_current();

        if index + 1 < total {
            // 自动续播：恰好前进一个索引
            self.start_chunk(index + 1).await;
        } else {
            self.complete(index);
        }
    }

    /// 自然播放完毕：进度强制 100，完成事件恰好发射一次
    fn complete(&mut self, last_index: u32) {
        self.release_current();
        if let Some(session) = self.session.as_mut() {
            session.chunk_index = session.total_chunks;
            session.chunk_fraction = 0.0;
        }
        self.last_progress = 100.0;
        let _ = self.events.send(PlaybackEvent::Progress {
            percent: 100.0,
            chunk_index: last_index,
        });
        if !self.completed_fired {
            self.completed_fired = true;
            let _ = self.events.send(PlaybackEvent::Completed);
        }
        self.set_state(PlaybackState::Completed);
    }

    async fn begin_fallback(&mut self) {
        self.release_fallback();
        let Some(fallback) = self.fallback.clone() else {
            self.fail("no chunks available and no fallback synthesizer");
            return;
        };
        let Some(text) = self.raw_text.clone() else {
            self.fail("no chunks available and no raw text for fallback");
            return;
        };

        match fallback.speak(&text).await {
            Ok(playback) => {
                self.fallback_ctl = Some(playback.control);
                self.fallback_events = Some(playback.events);
                self.fallback_started = Some(Instant::now());
                self.fallback_est_secs =
                    estimate_speech_secs(&text, self.config.fallback_words_per_minute);
                self.set_state(PlaybackState::FallbackPlaying);
            }
            Err(e) => {
                // 分块路径和设备端路径都不可用，才对用户暴露错误
                self.fail(format!("fallback synthesizer unavailable: {}", e));
            }
        }
    }

    fn on_fallback_event(&mut self, event: Option<FallbackEvent>) {
        match event {
            Some(FallbackEvent::Started) => {}
            Some(FallbackEvent::Ended) | None => {
                self.release_fallback();
                self.last_progress = 100.0;
                let _ = self.events.send(PlaybackEvent::Progress {
                    percent: 100.0,
                    chunk_index: 0,
                });
                if !self.completed_fired {
                    self.completed_fired = true;
                    let _ = self.events.send(PlaybackEvent::Completed);
                }
                self.set_state(PlaybackState::Completed);
            }
            Some(FallbackEvent::Error(message)) => {
                self.release_fallback();
                self.fail(format!("fallback synthesizer failed: {}", message));
            }
        }
    }

    fn handle_pause(&mut self) {
        match self.state {
            PlaybackState::Playing => {
                // 记录分块内位置：续播从暂停点继续，绝不回到分块开头
                if let (Some(control), Some(session)) =
                    (self.current.as_mut(), self.session.as_mut())
                {
                    session.chunk_fraction = control.chunk_fraction();
                    control.pause();
                }
                self.set_state(PlaybackState::Paused);
            }
            PlaybackState::FallbackPlaying => {
                tracing::debug!("Fallback playback does not support pause, ignoring");
            }
            _ => {}
        }
    }

    fn handle_resume(&mut self) {
        if self.state == PlaybackState::Paused {
            if let Some(control) = self.current.as_mut() {
                control.resume();
            }
            self.set_state(PlaybackState::Playing);
        }
    }

    fn handle_stop(&mut self) {
        self.release_all();
        self.session = None;
        self.chunks = Vec::new();
        self.raw_text = None;
        self.last_progress = 0.0;
        let _ = self.events.send(PlaybackEvent::Progress {
            percent: 0.0,
            chunk_index: 0,
        });
        self.set_state(PlaybackState::Idle);
    }

    async fn handle_seek(&mut self, index: u32) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.total_chunks == 0 {
            // 回退播放不支持 seek
            return;
        }
        if index >= session.total_chunks {
            tracing::debug!(index, total = session.total_chunks, "Seek out of range, ignoring");
            return;
        }

        self.last_progress = 0.0;
        self.start_chunk(index).await;
    }

    async fn handle_skip(&mut self, delta: i64) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.total_chunks == 0 {
            return;
        }

        let target = session.chunk_index as i64 + delta;
        // 边界跳转是无操作：首分块不后退，末分块不前进
        if target < 0 || target >= session.total_chunks as i64 {
            return;
        }

        self.last_progress = 0.0;
        self.start_chunk(target as u32).await;
    }

    fn handle_set_rate(&mut self, rate: f32) {
        let rate = rate.clamp(0.25, 4.0);
        self.rate = rate;
        if let Some(session) = self.session.as_mut() {
            session.rate = rate;
        }
        // 立即作用于当前音频资源，后续分块在加载时沿用
        if let Some(control) = self.current.as_mut() {
            control.set_rate(rate);
        }
    }

    async fn handle_change_voice(&mut self, voice_name: String) {
        let Some(session) = self.session.as_ref() else {
            return;
        };

        // 作废当前分块集，从索引 0 重新加载
        let request = PlayRequest {
            content_id: session.content_id,
            voice_name,
            raw_text: self.raw_text.clone(),
            resume_index: None,
        };
        self.handle_play(request).await;
    }

    fn emit_progress(&mut self) {
        let (percent, chunk_index) = match self.state {
            PlaybackState::Playing => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                if let Some(control) = self.current.as_ref() {
                    session.chunk_fraction = control.chunk_fraction();
                }
                (session.overall_progress(), session.chunk_index)
            }
            PlaybackState::FallbackPlaying => {
                let Some(started) = self.fallback_started else {
                    return;
                };
                let elapsed = started.elapsed().as_secs_f64();
                // 无原生进度信号：按词数估算，完成事件之前封顶在 100 以下
                let percent = if self.fallback_est_secs > 0.0 {
                    ((elapsed / self.fallback_est_secs) * 100.0).min(99.0) as f32
                } else {
                    0.0
                };
                (percent, 0)
            }
            _ => return,
        };

        // 正向播放期间进度单调不减
        let percent = percent.max(self.last_progress);
        self.last_progress = percent;
        let _ = self.events.send(PlaybackEvent::Progress {
            percent,
            chunk_index,
        });
    }

    fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(error = %message, "Playback failed");
        self.release_all();
        let _ = self.events.send(PlaybackEvent::Error(message));
        self.set_state(PlaybackState::Error);
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        self.state = state;
        let _ = self.state_tx.send(state);
        let _ = self.events.send(PlaybackEvent::StateChanged(state));
    }

    fn release_current(&mut self) {
        self.chunk_ended = None;
        if let Some(mut control) = self.current.take() {
            control.release();
        }
    }

    fn release_fallback(&mut self) {
        self.fallback_events = None;
        self.fallback_started = None;
        if let Some(mut control) = self.fallback_ctl.take() {
            control.stop();
        }
    }

    fn release_all(&mut self) {
        self.release_current();
        self.release_fallback();
    }
}
