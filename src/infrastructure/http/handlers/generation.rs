//! Generation HTTP Handlers
//!
//! generate: 派发后台生成，立即返回
//! process_next: 预生成调度的一个有界工作单元

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::generation::DispatchOutcome;
use crate::application::ports::{ProcessNextPort, ProcessOutcome};
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub content_id: Uuid,
    pub voice: String,
    /// 正文仓储查不到时的兜底文本
    pub raw_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub content_id: Uuid,
    pub voice: String,
    pub status: String, // "started" | "already_running"
}

/// 触发 (content, voice) 的后台生成，立即返回
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<ApiResponse<GenerateResponse>>, ApiError> {
    let outcome = state
        .dispatcher
        .dispatch(req.content_id, &req.voice, req.raw_text)
        .await?;

    let status = match outcome {
        DispatchOutcome::Started => "started",
        DispatchOutcome::AlreadyRunning => "already_running",
    };

    Ok(Json(ApiResponse::success(GenerateResponse {
        content_id: req.content_id,
        voice: req.voice,
        status: status.to_string(),
    })))
}

#[derive(Debug, Serialize)]
pub struct ProcessingPairResponse {
    pub content_id: Uuid,
    pub voice: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessNextResponse {
    pub done: bool,
    pub processing: Option<ProcessingPairResponse>,
}

/// 预生成调度：派发窗口内第一个不完整的 (content, voice) 对
pub async fn process_next(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<ProcessNextResponse>>, ApiError> {
    let outcome = state.scheduler.process_next().await?;

    let response = match outcome {
        ProcessOutcome::Processing {
            content_id,
            voice_name,
        } => ProcessNextResponse {
            done: false,
            processing: Some(ProcessingPairResponse {
                content_id,
                voice: voice_name,
            }),
        },
        ProcessOutcome::Done => ProcessNextResponse {
            done: true,
            processing: None,
        },
    };

    Ok(Json(ApiResponse::success(response)))
}
