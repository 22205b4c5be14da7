//! SQLite Content Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DbPool;
use crate::application::ports::{ContentRecord, ContentRepositoryPort, RepositoryError};

/// SQLite Content Repository
pub struct SqliteContentRepository {
    pool: DbPool,
}

impl SqliteContentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ContentRow {
    id: String,
    title: String,
    body: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ContentRow> for ContentRecord {
    type Error = RepositoryError;

    fn try_from(row: ContentRow) -> Result<Self, Self::Error> {
        Ok(ContentRecord {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            title: row.title,
            body: row.body,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
                .with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&row.updated_at)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

const SELECT_COLUMNS: &str = "id, title, body, created_at, updated_at";

#[async_trait]
impl ContentRepositoryPort for SqliteContentRepository {
    async fn upsert(&self, content: &ContentRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO contents (id, title, body, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(content.id.to_string())
        .bind(&content.title)
        .bind(&content.body)
        .bind(content.created_at.to_rfc3339())
        .bind(content.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentRecord>, RepositoryError> {
        let row: Option<ContentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM contents WHERE id = ?",
            SELECT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(ContentRecord::try_from).transpose()
    }

    async fn find_recent(&self, limit: u32) -> Result<Vec<ContentRecord>, RepositoryError> {
        let rows: Vec<ContentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM contents ORDER BY created_at DESC, id LIMIT ?",
            SELECT_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(ContentRecord::try_from).collect()
    }

    async fn list_all(&self) -> Result<Vec<ContentRecord>, RepositoryError> {
        let rows: Vec<ContentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM contents ORDER BY created_at DESC, id",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(ContentRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};

    async fn test_repo() -> SqliteContentRepository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteContentRepository::new(pool)
    }

    #[tokio::test]
    async fn test_upsert_and_find() {
        let repo = test_repo().await;
        let record = ContentRecord::new(Uuid::new_v4(), "Title", "Body text.");

        repo.upsert(&record).await.unwrap();
        let found = repo.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Title");
        assert_eq!(found.body, "Body text.");

        // 更新正文，created_at 不变
        let mut revised = record.clone();
        revised.body = "Revised body.".to_string();
        revised.updated_at = Utc::now();
        repo.upsert(&revised).await.unwrap();

        let found = repo.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(found.body, "Revised body.");
        assert_eq!(
            found.created_at.to_rfc3339(),
            record.created_at.to_rfc3339()
        );
    }

    #[tokio::test]
    async fn test_find_missing_returns_none() {
        let repo = test_repo().await;
        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_recent_window() {
        let repo = test_repo().await;

        let mut ids = Vec::new();
        for i in 0..5 {
            let mut record = ContentRecord::new(Uuid::new_v4(), format!("t{}", i), "body.");
            record.created_at = Utc::now() + chrono::Duration::seconds(i);
            record.updated_at = record.created_at;
            ids.push(record.id);
            repo.upsert(&record).await.unwrap();
        }

        let recent = repo.find_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, ids[4]);
        assert_eq!(recent[1].id, ids[3]);

        assert_eq!(repo.list_all().await.unwrap().len(), 5);
    }
}
