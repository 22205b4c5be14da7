//! SQLite Chunk Store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DbPool;
use crate::application::ports::{
    ChunkRecord, ChunkStorePort, InsertOutcome, NewChunk, StoreError,
};

/// SQLite Chunk Store
pub struct SqliteChunkStore {
    pool: DbPool,
}

impl SqliteChunkStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ChunkRow {
    content_id: String,
    voice_name: String,
    chunk_index: i64,
    audio: Vec<u8>,
    created_at: String,
}

impl TryFrom<ChunkRow> for ChunkRecord {
    type Error = StoreError;

    fn try_from(row: ChunkRow) -> Result<Self, Self::Error> {
        Ok(ChunkRecord {
            content_id: Uuid::parse_str(&row.content_id)
                .map_err(|e| StoreError::SerializationError(e.to_string()))?,
            voice_name: row.voice_name,
            chunk_index: row.chunk_index as u32,
            audio: row.audio,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map_err(|e| StoreError::SerializationError(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl ChunkStorePort for SqliteChunkStore {
    async fn exists(
        &self,
        content_id: Uuid,
        voice_name: &str,
        chunk_index: u32,
    ) -> Result<bool, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM audio_chunks WHERE content_id = ? AND voice_name = ? AND chunk_index = ?",
        )
        .bind(content_id.to_string())
        .bind(voice_name)
        .bind(chunk_index as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(row.is_some())
    }

    async fn count(&self, content_id: Uuid, voice_name: &str) -> Result<u32, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM audio_chunks WHERE content_id = ? AND voice_name = ?",
        )
        .bind(content_id.to_string())
        .bind(voice_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(count as u32)
    }

    async fn get_ordered(
        &self,
        content_id: Uuid,
        voice_name: &str,
    ) -> Result<Vec<ChunkRecord>, StoreError> {
        let rows: Vec<ChunkRow> = sqlx::query_as(
            "SELECT content_id, voice_name, chunk_index, audio, created_at FROM audio_chunks WHERE content_id = ? AND voice_name = ? ORDER BY chunk_index",
        )
        .bind(content_id.to_string())
        .bind(voice_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(ChunkRecord::try_from).collect()
    }

    async fn insert_if_absent(&self, chunk: NewChunk) -> Result<InsertOutcome, StoreError> {
        // ON CONFLICT DO NOTHING: 并发写者中恰好一方落库，
        // 落败方 rows_affected = 0，不报错
        let result = sqlx::query(
            r#"
            INSERT INTO audio_chunks (content_id, voice_name, chunk_index, audio, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(content_id, voice_name, chunk_index) DO NOTHING
            "#,
        )
        .bind(chunk.content_id.to_string())
        .bind(&chunk.voice_name)
        .bind(chunk.chunk_index as i64)
        .bind(&chunk.audio)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 1 {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::AlreadyPresent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};
    use std::sync::Arc;

    async fn test_store() -> SqliteChunkStore {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteChunkStore::new(pool)
    }

    fn new_chunk(content_id: Uuid, index: u32, audio: &[u8]) -> NewChunk {
        NewChunk {
            content_id,
            voice_name: "amber".to_string(),
            chunk_index: index,
            audio: audio.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let store = test_store().await;
        let id = Uuid::new_v4();

        let outcome = store
            .insert_if_absent(new_chunk(id, 0, b"audio-bytes"))
            .await
            .unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted);

        assert!(store.exists(id, "amber", 0).await.unwrap());
        assert_eq!(store.count(id, "amber").await.unwrap(), 1);

        let records = store.get_ordered(id, "amber").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].audio, b"audio-bytes");
        assert_eq!(records[0].chunk_index, 0);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_silent() {
        let store = test_store().await;
        let id = Uuid::new_v4();

        let first = store
            .insert_if_absent(new_chunk(id, 2, b"first-writer"))
            .await
            .unwrap();
        let second = store
            .insert_if_absent(new_chunk(id, 2, b"second-writer"))
            .await
            .unwrap();

        assert_eq!(first, InsertOutcome::Inserted);
        assert_eq!(second, InsertOutcome::AlreadyPresent);

        // 先到先得，后写方不覆盖
        let records = store.get_ordered(id, "amber").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].audio, b"first-writer");
    }

    #[tokio::test]
    async fn test_concurrent_writers_single_row() {
        // 并发写需要共享数据库文件（内存库每个连接各自独立）
        let dir = tempfile::tempdir().unwrap();
        let mut config = DatabaseConfig::new(dir.path().join("chunks.db"));
        config.max_connections = 4;
        let pool = create_pool(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let store = Arc::new(SqliteChunkStore::new(pool));
        let id = Uuid::new_v4();

        let a = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .insert_if_absent(new_chunk(id, 7, b"writer-a"))
                    .await
                    .unwrap()
            })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .insert_if_absent(new_chunk(id, 7, b"writer-b"))
                    .await
                    .unwrap()
            })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        let inserted = [a, b]
            .iter()
            .filter(|o| **o == InsertOutcome::Inserted)
            .count();

        assert_eq!(inserted, 1);
        assert_eq!(store.count(id, "amber").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_ordered_sorts_and_tolerates_holes() {
        let store = test_store().await;
        let id = Uuid::new_v4();

        // 乱序写入且缺 index 2：空洞是合法的瞬态
        for index in [3u32, 0, 4, 1] {
            store
                .insert_if_absent(new_chunk(id, index, &[index as u8]))
                .await
                .unwrap();
        }

        let records = store.get_ordered(id, "amber").await.unwrap();
        let indices: Vec<u32> = records.iter().map(|r| r.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 3, 4]);
    }

    #[tokio::test]
    async fn test_keys_isolate_content_and_voice() {
        let store = test_store().await;
        let id_a = Uuid::new_v4();
        let id_b = Uuid::new_v4();

        store
            .insert_if_absent(new_chunk(id_a, 0, b"a"))
            .await
            .unwrap();
        store
            .insert_if_absent(NewChunk {
                content_id: id_a,
                voice_name: "slate".to_string(),
                chunk_index: 0,
                audio: b"s".to_vec(),
            })
            .await
            .unwrap();

        assert_eq!(store.count(id_a, "amber").await.unwrap(), 1);
        assert_eq!(store.count(id_a, "slate").await.unwrap(), 1);
        assert_eq!(store.count(id_b, "amber").await.unwrap(), 0);
    }
}
