//! Application State

use std::sync::Arc;

use crate::application::generation::{GenerationDispatcher, PregenScheduler};
use crate::application::ports::{
    ChunkStorePort, ContentRepositoryPort, SpeechProviderPort, VoiceCatalogPort,
};

/// 应用状态
pub struct AppState {
    pub content_repo: Arc<dyn ContentRepositoryPort>,
    pub voice_catalog: Arc<dyn VoiceCatalogPort>,
    pub chunk_store: Arc<dyn ChunkStorePort>,
    pub speech_provider: Arc<dyn SpeechProviderPort>,
    pub dispatcher: Arc<GenerationDispatcher>,
    pub scheduler: Arc<PregenScheduler>,
}

impl AppState {
    pub fn new(
        content_repo: Arc<dyn ContentRepositoryPort>,
        voice_catalog: Arc<dyn VoiceCatalogPort>,
        chunk_store: Arc<dyn ChunkStorePort>,
        speech_provider: Arc<dyn SpeechProviderPort>,
        dispatcher: Arc<GenerationDispatcher>,
        scheduler: Arc<PregenScheduler>,
    ) -> Self {
        Self {
            content_repo,
            voice_catalog,
            chunk_store,
            speech_provider,
            dispatcher,
            scheduler,
        }
    }
}
