//! SQLite Voice Catalog

use async_trait::async_trait;
use chrono::Utc;
use sqlx::FromRow;

use super::DbPool;
use crate::application::ports::{RepositoryError, VoiceCatalogPort, VoiceProfile};

/// SQLite Voice Catalog
pub struct SqliteVoiceCatalog {
    pool: DbPool,
}

impl SqliteVoiceCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct VoiceRow {
    name: String,
    locale: String,
    gender: String,
}

impl From<VoiceRow> for VoiceProfile {
    fn from(row: VoiceRow) -> Self {
        VoiceProfile {
            name: row.name,
            locale: row.locale,
            gender: row.gender,
        }
    }
}

#[async_trait]
impl VoiceCatalogPort for SqliteVoiceCatalog {
    async fn upsert(&self, voice: &VoiceProfile) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO voices (name, locale, gender, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                locale = excluded.locale,
                gender = excluded.gender
            "#,
        )
        .bind(&voice.name)
        .bind(&voice.locale)
        .bind(&voice.gender)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<VoiceProfile>, RepositoryError> {
        let row: Option<VoiceRow> =
            sqlx::query_as("SELECT name, locale, gender FROM voices WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(row.map(VoiceProfile::from))
    }

    async fn list(&self) -> Result<Vec<VoiceProfile>, RepositoryError> {
        let rows: Vec<VoiceRow> =
            sqlx::query_as("SELECT name, locale, gender FROM voices ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(VoiceProfile::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};

    async fn test_catalog() -> SqliteVoiceCatalog {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteVoiceCatalog::new(pool)
    }

    fn voice(name: &str) -> VoiceProfile {
        VoiceProfile {
            name: name.to_string(),
            locale: "en-US".to_string(),
            gender: "female".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_list() {
        let catalog = test_catalog().await;

        catalog.upsert(&voice("slate")).await.unwrap();
        catalog.upsert(&voice("amber")).await.unwrap();
        // 重复登记不产生新条目
        catalog.upsert(&voice("amber")).await.unwrap();

        let voices = catalog.list().await.unwrap();
        let names: Vec<&str> = voices.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["amber", "slate"]);

        assert!(catalog.find_by_name("amber").await.unwrap().is_some());
        assert!(catalog.find_by_name("onyx").await.unwrap().is_none());
    }
}
