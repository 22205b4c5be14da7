//! In-Memory Voice Catalog Implementation

use async_trait::async_trait;
use dashmap::DashMap;

use crate::application::ports::{RepositoryError, VoiceCatalogPort, VoiceProfile};

/// 内存音色目录
#[derive(Default)]
pub struct InMemoryVoiceCatalog {
    voices: DashMap<String, VoiceProfile>,
}

impl InMemoryVoiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VoiceCatalogPort for InMemoryVoiceCatalog {
    async fn upsert(&self, voice: &VoiceProfile) -> Result<(), RepositoryError> {
        self.voices.insert(voice.name.clone(), voice.clone());
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<VoiceProfile>, RepositoryError> {
        Ok(self.voices.get(name).map(|v| v.clone()))
    }

    async fn list(&self) -> Result<Vec<VoiceProfile>, RepositoryError> {
        let mut voices: Vec<VoiceProfile> = self.voices.iter().map(|v| v.clone()).collect();
        voices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(voices)
    }
}
