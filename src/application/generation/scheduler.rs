//! Pregen Scheduler - 无状态预生成调度
//!
//! 每次 process_next 调用做一个有界工作单元：扫描最近的正文窗口，
//! 对窗口内每个 (content, voice) 对，比较已存分块数与现算预期值；
//! 找到第一个不完整的对就派发一次后台生成并立即返回。
//! 没有常驻进程、没有持久化队列，外部驱动器反复调用即可把
//! 整个语料的积压逐步清空。

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::generation::dispatcher::GenerationDispatcher;
use crate::application::ports::{
    ChunkStorePort, ContentRepositoryPort, ProcessNextPort, ProcessOutcome, SchedulerError,
    VoiceCatalogPort,
};
use crate::domain::splitter::{self, SplitConfig};

/// 调度器配置
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// 每次扫描的最近正文条数
    pub window_size: u32,
    /// 与生成器一致的分块上限（预期值必须与生成结果同源）
    pub max_chunk_chars: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            max_chunk_chars: splitter::DEFAULT_MAX_CHUNK_CHARS,
        }
    }
}

/// 预生成调度器
pub struct PregenScheduler {
    config: SchedulerConfig,
    content_repo: Arc<dyn ContentRepositoryPort>,
    voice_catalog: Arc<dyn VoiceCatalogPort>,
    store: Arc<dyn ChunkStorePort>,
    dispatcher: Arc<GenerationDispatcher>,
}

impl PregenScheduler {
    pub fn new(
        config: SchedulerConfig,
        content_repo: Arc<dyn ContentRepositoryPort>,
        voice_catalog: Arc<dyn VoiceCatalogPort>,
        store: Arc<dyn ChunkStorePort>,
        dispatcher: Arc<GenerationDispatcher>,
    ) -> Self {
        Self {
            config,
            content_repo,
            voice_catalog,
            store,
            dispatcher,
        }
    }
}

#[async_trait]
impl ProcessNextPort for PregenScheduler {
    async fn process_next(&self) -> Result<ProcessOutcome, SchedulerError> {
        let window = self
            .content_repo
            .find_recent(self.config.window_size)
            .await
            .map_err(|e| SchedulerError::Internal(e.to_string()))?;

        let voices = self
            .voice_catalog
            .list()
            .await
            .map_err(|e| SchedulerError::Internal(e.to_string()))?;

        let split_config = SplitConfig {
            max_chunk_chars: self.config.max_chunk_chars,
        };

        for content in &window {
            let expected = splitter::split_chunks(&content.body, &split_config).len() as u32;
            if expected == 0 {
                continue;
            }

            for voice in &voices {
                let have = self
                    .store
                    .count(content.id, &voice.name)
                    .await
                    .map_err(|e| SchedulerError::Internal(e.to_string()))?;

                if have < expected {
                    // 第一个不完整的对：派发后立即返回，不等待完成
                    self.dispatcher
                        .dispatch(content.id, &voice.name, Some(content.body.clone()))
                        .await
                        .map_err(|e| SchedulerError::Internal(e.to_string()))?;

                    tracing::debug!(
                        content_id = %content.id,
                        voice = %voice.name,
                        have,
                        expected,
                        "Pregen dispatched"
                    );

                    return Ok(ProcessOutcome::Processing {
                        content_id: content.id,
                        voice_name: voice.name.clone(),
                    });
                }
            }
        }

        tracing::debug!(
            window = window.len(),
            voices = voices.len(),
            "Pregen window fully generated"
        );

        Ok(ProcessOutcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::generation::dispatcher::GenerationTracker;
    use crate::application::generation::generator::{ChunkGenerator, GeneratorConfig};
    use crate::application::ports::{ContentRecord, VoiceProfile};
    use crate::infrastructure::adapters::provider::FakeSpeechClient;
    use crate::infrastructure::memory::{
        InMemoryChunkStore, InMemoryContentRepository, InMemoryVoiceCatalog,
    };
    use std::time::Duration;
    use uuid::Uuid;

    struct Fixture {
        scheduler: PregenScheduler,
        store: Arc<InMemoryChunkStore>,
        content_repo: Arc<InMemoryContentRepository>,
        voice_catalog: Arc<InMemoryVoiceCatalog>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryChunkStore::new());
        let provider = Arc::new(FakeSpeechClient::new());
        let generator_config = GeneratorConfig {
            max_chunk_chars: 40,
            max_attempts: 2,
            default_backoff: Duration::from_millis(1),
            pacing_delay: Duration::from_millis(1),
        };
        let generator = Arc::new(ChunkGenerator::new(
            generator_config,
            store.clone(),
            provider,
        ));
        let content_repo = Arc::new(InMemoryContentRepository::new());
        let dispatcher = Arc::new(GenerationDispatcher::new(
            generator,
            content_repo.clone(),
            Arc::new(GenerationTracker::new()),
        ));
        let voice_catalog = Arc::new(InMemoryVoiceCatalog::new());
        let scheduler = PregenScheduler::new(
            SchedulerConfig {
                window_size: 10,
                max_chunk_chars: 40,
            },
            content_repo.clone(),
            voice_catalog.clone(),
            store.clone(),
            dispatcher,
        );
        Fixture {
            scheduler,
            store,
            content_repo,
            voice_catalog,
        }
    }

    async fn seed_voice(fixture: &Fixture, name: &str) {
        fixture
            .voice_catalog
            .upsert(&VoiceProfile {
                name: name.to_string(),
                locale: "en-US".to_string(),
                gender: "female".to_string(),
            })
            .await
            .unwrap();
    }

    async fn wait_until_complete(fixture: &Fixture, content_id: Uuid, voice: &str, expected: u32) {
        for _ in 0..200 {
            if fixture.store.count(content_id, voice).await.unwrap() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("generation did not complete");
    }

    #[tokio::test]
    async fn test_empty_corpus_is_done() {
        let fixture = fixture();
        seed_voice(&fixture, "amber").await;

        let outcome = fixture.scheduler.process_next().await.unwrap();
        assert_eq!(outcome, ProcessOutcome::Done);
    }

    #[tokio::test]
    async fn test_under_generated_pair_is_dispatched() {
        let fixture = fixture();
        seed_voice(&fixture, "amber").await;

        let content = ContentRecord::new(
            Uuid::new_v4(),
            "t",
            "The first sentence runs long enough. The second sentence also runs long.",
        );
        fixture.content_repo.upsert(&content).await.unwrap();

        let outcome = fixture.scheduler.process_next().await.unwrap();
        match outcome {
            ProcessOutcome::Processing {
                content_id,
                voice_name,
            } => {
                assert_eq!(content_id, content.id);
                assert_eq!(voice_name, "amber");
            }
            other => panic!("expected Processing, got {:?}", other),
        }

        wait_until_complete(&fixture, content.id, "amber", 2).await;

        // 补齐后整个窗口完整
        let outcome = fixture.scheduler.process_next().await.unwrap();
        assert_eq!(outcome, ProcessOutcome::Done);
    }

    #[tokio::test]
    async fn test_scans_every_voice_per_content() {
        let fixture = fixture();
        seed_voice(&fixture, "amber").await;
        seed_voice(&fixture, "slate").await;

        let content = ContentRecord::new(Uuid::new_v4(), "t", "Single sentence body.");
        fixture.content_repo.upsert(&content).await.unwrap();

        // 反复调用直到两种音色都补齐
        for _ in 0..100 {
            if fixture.scheduler.process_next().await.unwrap() == ProcessOutcome::Done {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(fixture.store.count(content.id, "amber").await.unwrap(), 1);
        assert_eq!(fixture.store.count(content.id, "slate").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_invocations_are_tolerated() {
        let fixture = fixture();
        seed_voice(&fixture, "amber").await;

        let content = ContentRecord::new(
            Uuid::new_v4(),
            "t",
            "The first sentence runs long enough. The second sentence also runs long.",
        );
        fixture.content_repo.upsert(&content).await.unwrap();

        // 同时发起两次调度：幂等插入保证不重复落库
        let (a, b) = tokio::join!(
            fixture.scheduler.process_next(),
            fixture.scheduler.process_next()
        );
        assert!(a.is_ok());
        assert!(b.is_ok());

        wait_until_complete(&fixture, content.id, "amber", 2).await;
        assert_eq!(fixture.store.count(content.id, "amber").await.unwrap(), 2);
    }
}
