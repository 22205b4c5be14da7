//! In-Memory Chunk Store Implementation

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::application::ports::{
    ChunkRecord, ChunkStorePort, InsertOutcome, NewChunk, StoreError,
};

type ChunkKey = (Uuid, String, u32);

/// 内存分块存储
///
/// entry API 提供与 SQLite 唯一约束等价的幂等插入语义
#[derive(Default)]
pub struct InMemoryChunkStore {
    chunks: DashMap<ChunkKey, ChunkRecord>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChunkStorePort for InMemoryChunkStore {
    async fn exists(
        &self,
        content_id: Uuid,
        voice_name: &str,
        chunk_index: u32,
    ) -> Result<bool, StoreError> {
        Ok(self
            .chunks
            .contains_key(&(content_id, voice_name.to_string(), chunk_index)))
    }

    async fn count(&self, content_id: Uuid, voice_name: &str) -> Result<u32, StoreError> {
        let count = self
            .chunks
            .iter()
            .filter(|entry| {
                let (id, voice, _) = entry.key();
                *id == content_id && voice == voice_name
            })
            .count();
        Ok(count as u32)
    }

    async fn get_ordered(
        &self,
        content_id: Uuid,
        voice_name: &str,
    ) -> Result<Vec<ChunkRecord>, StoreError> {
        let mut records: Vec<ChunkRecord> = self
            .chunks
            .iter()
            .filter(|entry| {
                let (id, voice, _) = entry.key();
                *id == content_id && voice == voice_name
            })
            .map(|entry| entry.value().clone())
            .collect();

        records.sort_by_key(|r| r.chunk_index);
        Ok(records)
    }

    async fn insert_if_absent(&self, chunk: NewChunk) -> Result<InsertOutcome, StoreError> {
        use dashmap::mapref::entry::Entry;

        let key = (
            chunk.content_id,
            chunk.voice_name.clone(),
            chunk.chunk_index,
        );

        match self.chunks.entry(key) {
            Entry::Occupied(_) => Ok(InsertOutcome::AlreadyPresent),
            Entry::Vacant(entry) => {
                entry.insert(ChunkRecord {
                    content_id: chunk.content_id,
                    voice_name: chunk.voice_name,
                    chunk_index: chunk.chunk_index,
                    audio: chunk.audio,
                    created_at: Utc::now(),
                });
                Ok(InsertOutcome::Inserted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_chunk(content_id: Uuid, index: u32) -> NewChunk {
        NewChunk {
            content_id,
            voice_name: "amber".to_string(),
            chunk_index: index,
            audio: vec![index as u8; 4],
        }
    }

    #[tokio::test]
    async fn test_insert_twice_keeps_one_row() {
        let store = InMemoryChunkStore::new();
        let id = Uuid::new_v4();

        let first = store.insert_if_absent(new_chunk(id, 0)).await.unwrap();
        let second = store.insert_if_absent(new_chunk(id, 0)).await.unwrap();

        assert_eq!(first, InsertOutcome::Inserted);
        assert_eq!(second, InsertOutcome::AlreadyPresent);
        assert_eq!(store.count(id, "amber").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_single_row() {
        let store = std::sync::Arc::new(InMemoryChunkStore::new());
        let id = Uuid::new_v4();

        let a = {
            let store = store.clone();
            tokio::spawn(async move { store.insert_if_absent(new_chunk(id, 3)).await.unwrap() })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move { store.insert_if_absent(new_chunk(id, 3)).await.unwrap() })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        // 恰好一方写入成功，另一方静默让路
        let inserted = [a, b]
            .iter()
            .filter(|o| **o == InsertOutcome::Inserted)
            .count();
        assert_eq!(inserted, 1);
        assert_eq!(store.count(id, "amber").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_ordered_sorts_by_index() {
        let store = InMemoryChunkStore::new();
        let id = Uuid::new_v4();

        for index in [2u32, 0, 1] {
            store.insert_if_absent(new_chunk(id, index)).await.unwrap();
        }

        let records = store.get_ordered(id, "amber").await.unwrap();
        let indices: Vec<u32> = records.iter().map(|r| r.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_voices_are_isolated() {
        let store = InMemoryChunkStore::new();
        let id = Uuid::new_v4();

        store.insert_if_absent(new_chunk(id, 0)).await.unwrap();

        assert!(store.exists(id, "amber", 0).await.unwrap());
        assert!(!store.exists(id, "slate", 0).await.unwrap());
        assert_eq!(store.count(id, "slate").await.unwrap(), 0);
    }
}
