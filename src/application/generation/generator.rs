//! Chunk Generator - 逐分块合成

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::application::error::GenerationError;
use crate::application::ports::{
    ChunkStorePort, NewChunk, SpeechProviderPort, SynthesisOutcome, SynthesisRequest,
};
use crate::domain::splitter::{self, SplitConfig};

/// 生成器配置
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// 单个分块的最大字符数
    pub max_chunk_chars: usize,
    /// 单个分块的最大合成尝试次数
    pub max_attempts: u32,
    /// 限流且服务端未给出等待时长时的默认退避
    pub default_backoff: Duration,
    /// 相邻供应商调用之间的强制间隔（主动留在限流线以下）
    pub pacing_delay: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: splitter::DEFAULT_MAX_CHUNK_CHARS,
            max_attempts: 3,
            default_backoff: Duration::from_secs(2),
            pacing_delay: Duration::from_millis(250),
        }
    }
}

/// 一次生成调用的结果
///
/// "生成完毕" 定义为 chunks_generated == chunks_expected，
/// 其中预期值由分块器对正文现算，从不落库
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationReport {
    /// 本次调用结束时该 (content, voice) 已就位的分块数
    pub chunks_generated: u32,
    /// 分块器现算出的预期分块数
    pub chunks_expected: u32,
}

impl GenerationReport {
    pub fn is_complete(&self) -> bool {
        self.chunks_generated == self.chunks_expected
    }
}

/// 分块生成器
///
/// 逐分块推进：已存在的分块直接跳过；缺失的分块调用供应商合成，
/// 限流或瞬态失败时退避重试，重试耗尽则跳过该分块继续后面的
/// （失败是局部的，留给下一轮补齐）。
pub struct ChunkGenerator {
    config: GeneratorConfig,
    store: Arc<dyn ChunkStorePort>,
    provider: Arc<dyn SpeechProviderPort>,
}

impl ChunkGenerator {
    pub fn new(
        config: GeneratorConfig,
        store: Arc<dyn ChunkStorePort>,
        provider: Arc<dyn SpeechProviderPort>,
    ) -> Self {
        Self {
            config,
            store,
            provider,
        }
    }

    /// 为 (content, voice) 补齐缺失的分块
    pub async fn generate(
        &self,
        content_id: Uuid,
        text: &str,
        voice_name: &str,
    ) -> Result<GenerationReport, GenerationError> {
        let split_config = SplitConfig {
            max_chunk_chars: self.config.max_chunk_chars,
        };
        let chunks = splitter::split_chunks(text, &split_config);
        let expected = chunks.len() as u32;

        let mut generated = 0u32;
        let mut called_provider = false;

        for (index, chunk_text) in chunks.iter().enumerate() {
            let index = index as u32;

            // 已存在即成功，无操作
            if self.store.exists(content_id, voice_name, index).await? {
                generated += 1;
                continue;
            }

            // 相邻供应商调用之间的强制限速间隔
            if called_provider {
                tokio::time::sleep(self.config.pacing_delay).await;
            }

            match self
                .synthesize_with_retry(chunk_text, voice_name, &mut called_provider)
                .await?
            {
                Some(audio) => {
                    // 并发生成者可能已抢先写入；幂等插入两种结果都算就位
                    self.store
                        .insert_if_absent(NewChunk {
                            content_id,
                            voice_name: voice_name.to_string(),
                            chunk_index: index,
                            audio,
                        })
                        .await?;
                    generated += 1;
                }
                None => {
                    tracing::warn!(
                        content_id = %content_id,
                        voice = %voice_name,
                        chunk_index = index,
                        "Chunk retries exhausted, skipping"
                    );
                }
            }
        }

        let report = GenerationReport {
            chunks_generated: generated,
            chunks_expected: expected,
        };

        tracing::info!(
            content_id = %content_id,
            voice = %voice_name,
            generated = report.chunks_generated,
            expected = report.chunks_expected,
            complete = report.is_complete(),
            "Generation pass finished"
        );

        Ok(report)
    }

    /// 单个分块的合成重试循环
    ///
    /// 返回 Ok(None) 表示重试耗尽，调用方跳过该分块继续
    async fn synthesize_with_retry(
        &self,
        text: &str,
        voice_name: &str,
        called_provider: &mut bool,
    ) -> Result<Option<Vec<u8>>, GenerationError> {
        for attempt in 1..=self.config.max_attempts {
            *called_provider = true;

            let request = SynthesisRequest {
                text: text.to_string(),
                voice_name: voice_name.to_string(),
            };

            match self.provider.synthesize(request).await {
                Ok(SynthesisOutcome::Audio(synthesized)) => {
                    return Ok(Some(synthesized.audio));
                }
                Ok(SynthesisOutcome::Throttled { retry_after }) => {
                    let backoff = retry_after.unwrap_or(self.config.default_backoff);
                    tracing::debug!(
                        voice = %voice_name,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "Provider throttled, backing off"
                    );
                    if attempt < self.config.max_attempts {
                        tokio::time::sleep(backoff).await;
                    }
                }
                Err(e) if e.is_fatal() => {
                    return Err(GenerationError::Configuration(e.to_string()));
                }
                Err(e) => {
                    tracing::warn!(
                        voice = %voice_name,
                        attempt,
                        error = %e,
                        "Provider call failed"
                    );
                    if attempt < self.config.max_attempts {
                        tokio::time::sleep(self.config.default_backoff).await;
                    }
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::provider::{FakeSpeechClient, ScriptedOutcome};
    use crate::infrastructure::memory::InMemoryChunkStore;

    fn test_config() -> GeneratorConfig {
        GeneratorConfig {
            max_chunk_chars: 40,
            max_attempts: 3,
            default_backoff: Duration::from_millis(1),
            pacing_delay: Duration::from_millis(1),
        }
    }

    fn generator_with(
        provider: Arc<FakeSpeechClient>,
    ) -> (ChunkGenerator, Arc<InMemoryChunkStore>) {
        let store = Arc::new(InMemoryChunkStore::new());
        let generator = ChunkGenerator::new(test_config(), store.clone(), provider);
        (generator, store)
    }

    const TEXT: &str = "First sentence of the piece. Second sentence follows here. Third one closes it out.";

    #[tokio::test]
    async fn test_generates_all_chunks() {
        let provider = Arc::new(FakeSpeechClient::new());
        let (generator, store) = generator_with(provider.clone());
        let content_id = Uuid::new_v4();

        let report = generator.generate(content_id, TEXT, "amber").await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.chunks_expected, report.chunks_generated);
        assert_eq!(
            store.count(content_id, "amber").await.unwrap(),
            report.chunks_expected
        );
    }

    #[tokio::test]
    async fn test_second_pass_makes_no_provider_calls() {
        let provider = Arc::new(FakeSpeechClient::new());
        let (generator, store) = generator_with(provider.clone());
        let content_id = Uuid::new_v4();

        let first = generator.generate(content_id, TEXT, "amber").await.unwrap();
        let calls_after_first = provider.call_count();

        let second = generator.generate(content_id, TEXT, "amber").await.unwrap();

        // 幂等：第二轮零供应商调用、零新行
        assert_eq!(provider.call_count(), calls_after_first);
        assert_eq!(first, second);
        assert_eq!(
            store.count(content_id, "amber").await.unwrap(),
            second.chunks_expected
        );
    }

    #[tokio::test]
    async fn test_throttle_then_success_single_row() {
        // Scenario B: 第一次限流，第二次成功
        let provider = Arc::new(FakeSpeechClient::new());
        provider.script(ScriptedOutcome::Throttled {
            retry_after: Some(Duration::from_millis(1)),
        });
        let (generator, store) = generator_with(provider.clone());
        let content_id = Uuid::new_v4();

        let report = generator
            .generate(content_id, "Only one short sentence here.", "amber")
            .await
            .unwrap();

        assert_eq!(report.chunks_expected, 1);
        assert_eq!(report.chunks_generated, 1);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(store.count(content_id, "amber").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_chunk_is_skipped_not_fatal() {
        let provider = Arc::new(FakeSpeechClient::new());
        // 第一个分块三次全部瞬态失败，之后恢复
        for _ in 0..3 {
            provider.script(ScriptedOutcome::ServiceError);
        }
        let (generator, store) = generator_with(provider.clone());
        let content_id = Uuid::new_v4();

        let report = generator.generate(content_id, TEXT, "amber").await.unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.chunks_generated, report.chunks_expected - 1);
        assert_eq!(
            store.count(content_id, "amber").await.unwrap(),
            report.chunks_expected - 1
        );

        // 后续补齐轮次只为缺口调用供应商
        let calls_before = provider.call_count();
        let second = generator.generate(content_id, TEXT, "amber").await.unwrap();
        assert!(second.is_complete());
        assert_eq!(provider.call_count(), calls_before + 1);
    }

    #[tokio::test]
    async fn test_missing_credentials_is_fatal() {
        let provider = Arc::new(FakeSpeechClient::new());
        provider.script(ScriptedOutcome::MissingCredentials);
        let (generator, _store) = generator_with(provider.clone());

        let result = generator
            .generate(Uuid::new_v4(), TEXT, "amber")
            .await;

        assert!(matches!(result, Err(GenerationError::Configuration(_))));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_text_reports_zero_expected() {
        let provider = Arc::new(FakeSpeechClient::new());
        let (generator, _store) = generator_with(provider.clone());

        let report = generator
            .generate(Uuid::new_v4(), "   ", "amber")
            .await
            .unwrap();

        assert_eq!(report.chunks_expected, 0);
        assert!(report.is_complete());
        assert_eq!(provider.call_count(), 0);
    }
}
