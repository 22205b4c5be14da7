//! Generation Dispatcher - 派发即返回的后台生成入口
//!
//! 对外的 generate(content, voice) 语义：确保后台生成已启动，
//! 立即返回，不等待完成。生成任务以 tokio::spawn 挂起运行。
//!
//! 进程内用一张 DashMap 登记表避免为同一 (content, voice)
//! 重复起任务；跨进程的并发生成不做互斥，由 ChunkStore 的
//! 幂等插入兜底。

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::application::error::GenerationError;
use crate::application::generation::generator::ChunkGenerator;
use crate::application::ports::ContentRepositoryPort;

/// 进行中的 (content, voice) 生成登记表
#[derive(Default)]
pub struct GenerationTracker {
    in_flight: DashMap<(Uuid, String), ()>,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试登记；已有同对任务在跑时返回 false
    pub fn try_begin(&self, content_id: Uuid, voice_name: &str) -> bool {
        use dashmap::mapref::entry::Entry;
        match self.in_flight.entry((content_id, voice_name.to_string())) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(());
                true
            }
        }
    }

    pub fn finish(&self, content_id: Uuid, voice_name: &str) {
        self.in_flight
            .remove(&(content_id, voice_name.to_string()));
    }

    pub fn is_running(&self, content_id: Uuid, voice_name: &str) -> bool {
        self.in_flight
            .contains_key(&(content_id, voice_name.to_string()))
    }
}

/// 派发结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 本次调用新起了一个后台生成任务
    Started,
    /// 同对任务已在进行中，未重复起任务
    AlreadyRunning,
}

/// 生成派发器
pub struct GenerationDispatcher {
    generator: Arc<ChunkGenerator>,
    content_repo: Arc<dyn ContentRepositoryPort>,
    tracker: Arc<GenerationTracker>,
}

impl GenerationDispatcher {
    pub fn new(
        generator: Arc<ChunkGenerator>,
        content_repo: Arc<dyn ContentRepositoryPort>,
        tracker: Arc<GenerationTracker>,
    ) -> Self {
        Self {
            generator,
            content_repo,
            tracker,
        }
    }

    pub fn tracker(&self) -> &Arc<GenerationTracker> {
        &self.tracker
    }

    /// 确保 (content, voice) 的后台生成已启动，立即返回
    ///
    /// 正文取仓储，查不到时退回调用方给的兜底文本；
    /// 两者都没有则上抛 ContentNotFound
    pub async fn dispatch(
        &self,
        content_id: Uuid,
        voice_name: &str,
        raw_text: Option<String>,
    ) -> Result<DispatchOutcome, GenerationError> {
        let text = match self.content_repo.find_by_id(content_id).await? {
            Some(content) => content.body,
            None => raw_text.ok_or(GenerationError::ContentNotFound(content_id))?,
        };

        if !self.tracker.try_begin(content_id, voice_name) {
            tracing::debug!(
                content_id = %content_id,
                voice = %voice_name,
                "Generation already in flight"
            );
            return Ok(DispatchOutcome::AlreadyRunning);
        }

        let generator = self.generator.clone();
        let tracker = self.tracker.clone();
        let voice = voice_name.to_string();

        tokio::spawn(async move {
            let result = generator.generate(content_id, &text, &voice).await;
            tracker.finish(content_id, &voice);

            // 任务自身只留日志；单分块失败已在生成器内消化
            if let Err(e) = result {
                tracing::error!(
                    content_id = %content_id,
                    voice = %voice,
                    error = %e,
                    "Background generation failed"
                );
            }
        });

        tracing::debug!(
            content_id = %content_id,
            voice = %voice_name,
            "Background generation dispatched"
        );

        Ok(DispatchOutcome::Started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::generation::generator::GeneratorConfig;
    use crate::application::ports::{ChunkStorePort, ContentRecord};
    use crate::infrastructure::adapters::provider::FakeSpeechClient;
    use crate::infrastructure::memory::{InMemoryChunkStore, InMemoryContentRepository};
    use std::time::Duration;

    fn build_dispatcher() -> (
        GenerationDispatcher,
        Arc<InMemoryChunkStore>,
        Arc<InMemoryContentRepository>,
    ) {
        let store = Arc::new(InMemoryChunkStore::new());
        let provider = Arc::new(FakeSpeechClient::new());
        let config = GeneratorConfig {
            max_chunk_chars: 40,
            max_attempts: 2,
            default_backoff: Duration::from_millis(1),
            pacing_delay: Duration::from_millis(1),
        };
        let generator = Arc::new(ChunkGenerator::new(config, store.clone(), provider));
        let content_repo = Arc::new(InMemoryContentRepository::new());
        let dispatcher = GenerationDispatcher::new(
            generator,
            content_repo.clone(),
            Arc::new(GenerationTracker::new()),
        );
        (dispatcher, store, content_repo)
    }

    async fn wait_for_chunks(store: &InMemoryChunkStore, content_id: Uuid, voice: &str) -> u32 {
        for _ in 0..200 {
            let count = store.count(content_id, voice).await.unwrap();
            if count > 0 {
                return count;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        0
    }

    #[tokio::test]
    async fn test_dispatch_returns_immediately_and_fills_store() {
        let (dispatcher, store, content_repo) = build_dispatcher();
        let content = ContentRecord::new(Uuid::new_v4(), "t", "A sentence. Another sentence.");
        content_repo.upsert(&content).await.unwrap();

        let outcome = dispatcher.dispatch(content.id, "amber", None).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Started);

        assert!(wait_for_chunks(&store, content.id, "amber").await > 0);
    }

    #[tokio::test]
    async fn test_dispatch_uses_raw_text_fallback() {
        let (dispatcher, store, _content_repo) = build_dispatcher();
        let content_id = Uuid::new_v4();

        let outcome = dispatcher
            .dispatch(content_id, "amber", Some("Fallback body text.".to_string()))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Started);

        assert_eq!(wait_for_chunks(&store, content_id, "amber").await, 1);
    }

    #[tokio::test]
    async fn test_dispatch_without_content_or_fallback_errors() {
        let (dispatcher, _store, _content_repo) = build_dispatcher();

        let result = dispatcher.dispatch(Uuid::new_v4(), "amber", None).await;
        assert!(matches!(result, Err(GenerationError::ContentNotFound(_))));
    }

    #[tokio::test]
    async fn test_tracker_dedupes_in_flight_pairs() {
        let tracker = GenerationTracker::new();
        let id = Uuid::new_v4();

        assert!(tracker.try_begin(id, "amber"));
        assert!(!tracker.try_begin(id, "amber"));
        assert!(tracker.is_running(id, "amber"));

        // 不同音色互不影响
        assert!(tracker.try_begin(id, "slate"));

        tracker.finish(id, "amber");
        assert!(!tracker.is_running(id, "amber"));
        assert!(tracker.try_begin(id, "amber"));
    }
}
