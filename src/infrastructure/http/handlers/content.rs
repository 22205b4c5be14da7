//! Content HTTP Handlers
//!
//! 上游生产者边界：正文由外部系统产出，这里只接收和读取

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::ContentRecord;
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PutContentRequest {
    /// 省略时生成新 ID
    pub id: Option<Uuid>,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub id: Uuid,
    pub title: String,
    pub chars: usize,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct GetContentRequest {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ContentDetailResponse {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub created_at: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// 写入/更新正文
pub async fn put_content(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PutContentRequest>,
) -> Result<Json<ApiResponse<ContentResponse>>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("Content text is empty".to_string()));
    }

    let id = req.id.unwrap_or_else(Uuid::new_v4);
    let record = ContentRecord::new(id, req.title, req.text);
    state.content_repo.upsert(&record).await?;

    tracing::info!(
        content_id = %record.id,
        title = %record.title,
        chars = record.body.chars().count(),
        "Content stored"
    );

    Ok(Json(ApiResponse::success(ContentResponse {
        id: record.id,
        title: record.title,
        chars: record.body.chars().count(),
        created_at: record.created_at.to_rfc3339(),
    })))
}

/// 获取正文详情
pub async fn get_content(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GetContentRequest>,
) -> Result<Json<ApiResponse<ContentDetailResponse>>, ApiError> {
    let record = state
        .content_repo
        .find_by_id(req.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Content {} not found", req.id)))?;

    Ok(Json(ApiResponse::success(ContentDetailResponse {
        id: record.id,
        title: record.title,
        text: record.body,
        created_at: record.created_at.to_rfc3339(),
    })))
}

/// 列出所有正文
pub async fn list_contents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<ContentResponse>>>, ApiError> {
    let records = state.content_repo.list_all().await?;

    let responses: Vec<ContentResponse> = records
        .into_iter()
        .map(|r| ContentResponse {
            id: r.id,
            title: r.title,
            chars: r.body.chars().count(),
            created_at: r.created_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(ApiResponse::success(responses)))
}
