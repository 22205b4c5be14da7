//! Local Chunk Source - 进程内分块来源
//!
//! 播放引擎与生成管线同进程时使用：直接读 ChunkStore，
//! 生成请求走 GenerationDispatcher。

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::error::GenerationError;
use crate::application::generation::GenerationDispatcher;
use crate::application::ports::{
    ChunkSourcePort, ChunkStorePort, SourceChunk, SourceError,
};

/// 进程内分块来源
pub struct LocalChunkSource {
    store: Arc<dyn ChunkStorePort>,
    dispatcher: Arc<GenerationDispatcher>,
}

impl LocalChunkSource {
    pub fn new(store: Arc<dyn ChunkStorePort>, dispatcher: Arc<GenerationDispatcher>) -> Self {
        Self { store, dispatcher }
    }
}

#[async_trait]
impl ChunkSourcePort for LocalChunkSource {
    async fn get_chunks(
        &self,
        content_id: Uuid,
        voice_name: &str,
    ) -> Result<Vec<SourceChunk>, SourceError> {
        let records = self
            .store
            .get_ordered(content_id, voice_name)
            .await
            .map_err(|e| SourceError::InternalError(e.to_string()))?;

        Ok(records
            .into_iter()
            .map(|r| SourceChunk {
                index: r.chunk_index,
                audio: r.audio,
            })
            .collect())
    }

    async fn request_generation(
        &self,
        content_id: Uuid,
        voice_name: &str,
        raw_text: Option<&str>,
    ) -> Result<(), SourceError> {
        self.dispatcher
            .dispatch(content_id, voice_name, raw_text.map(str::to_string))
            .await
            .map(|_| ())
            .map_err(|e| match e {
                GenerationError::ContentNotFound(id) => {
                    SourceError::NotFound(format!("Content {} not found", id))
                }
                other => SourceError::InternalError(other.to_string()),
            })
    }
}
