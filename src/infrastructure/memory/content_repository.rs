//! In-Memory Content Repository Implementation

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::application::ports::{ContentRecord, ContentRepositoryPort, RepositoryError};

/// 内存正文仓储
#[derive(Default)]
pub struct InMemoryContentRepository {
    contents: DashMap<Uuid, ContentRecord>,
}

impl InMemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentRepositoryPort for InMemoryContentRepository {
    async fn upsert(&self, content: &ContentRecord) -> Result<(), RepositoryError> {
        // 先取出旧 created_at 并释放分片锁，再插入
        let existing_created_at = self.contents.get(&content.id).map(|e| e.created_at);

        let mut record = content.clone();
        if let Some(created_at) = existing_created_at {
            record.created_at = created_at;
            record.updated_at = Utc::now();
        }
        self.contents.insert(record.id, record);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentRecord>, RepositoryError> {
        Ok(self.contents.get(&id).map(|c| c.clone()))
    }

    async fn find_recent(&self, limit: u32) -> Result<Vec<ContentRecord>, RepositoryError> {
        let mut records: Vec<ContentRecord> =
            self.contents.iter().map(|c| c.clone()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn list_all(&self) -> Result<Vec<ContentRecord>, RepositoryError> {
        let mut records: Vec<ContentRecord> =
            self.contents.iter().map(|c| c.clone()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_recent_orders_and_limits() {
        let repo = InMemoryContentRepository::new();

        let mut ids = Vec::new();
        for i in 0..5 {
            let mut record = ContentRecord::new(Uuid::new_v4(), format!("t{}", i), "body.");
            record.created_at = Utc::now() + chrono::Duration::seconds(i);
            ids.push(record.id);
            repo.upsert(&record).await.unwrap();
        }

        let recent = repo.find_recent(3).await.unwrap();
        assert_eq!(recent.len(), 3);
        // 最新的在前
        assert_eq!(recent[0].id, ids[4]);
        assert_eq!(recent[1].id, ids[3]);
    }

    #[tokio::test]
    async fn test_upsert_preserves_created_at() {
        let repo = InMemoryContentRepository::new();
        let record = ContentRecord::new(Uuid::new_v4(), "t", "original body.");
        repo.upsert(&record).await.unwrap();

        let mut updated = record.clone();
        updated.body = "revised body.".to_string();
        repo.upsert(&updated).await.unwrap();

        let found = repo.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(found.body, "revised body.");
        assert_eq!(found.created_at, record.created_at);
    }
}
