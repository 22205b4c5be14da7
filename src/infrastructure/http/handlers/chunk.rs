//! Chunk HTTP Handlers

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListChunksRequest {
    pub content_id: Uuid,
    pub voice: String,
}

#[derive(Debug, Serialize)]
pub struct ChunkMetaResponse {
    pub index: u32,
    pub size_bytes: usize,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct ChunkListResponse {
    pub content_id: Uuid,
    pub voice: String,
    pub total: usize,
    pub chunks: Vec<ChunkMetaResponse>,
}

/// 获取 (content, voice) 已生成分块的元数据
///
/// 空列表是正常状态：生成尚未开始或尚未完成
pub async fn list_chunks(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ListChunksRequest>,
) -> Result<Json<ApiResponse<ChunkListResponse>>, ApiError> {
    let records = state
        .chunk_store
        .get_ordered(req.content_id, &req.voice)
        .await?;

    let chunks: Vec<ChunkMetaResponse> = records
        .iter()
        .map(|r| ChunkMetaResponse {
            index: r.chunk_index,
            size_bytes: r.audio.len(),
            created_at: r.created_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(ApiResponse::success(ChunkListResponse {
        content_id: req.content_id,
        voice: req.voice,
        total: chunks.len(),
        chunks,
    })))
}

/// 获取单个分块的音频字节
///
/// 二进制端点，错误直接用 HTTP 状态码表达
pub async fn get_chunk_audio(
    State(state): State<Arc<AppState>>,
    Path((content_id, voice, index)): Path<(Uuid, String, u32)>,
) -> Result<Response, ApiError> {
    let records = state.chunk_store.get_ordered(content_id, &voice).await?;

    let chunk = records.into_iter().find(|r| r.chunk_index == index);

    match chunk {
        Some(record) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            record.audio,
        )
            .into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}
