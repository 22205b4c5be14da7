//! Ping Handler

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::state::AppState;

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub message: String,
    /// 语音合成服务是否可达
    pub provider_healthy: bool,
}

/// 健康检查
pub async fn ping(State(state): State<Arc<AppState>>) -> Json<ApiResponse<PingResponse>> {
    let provider_healthy = state.speech_provider.health_check().await;

    Json(ApiResponse::success(PingResponse {
        message: "pong".to_string(),
        provider_healthy,
    }))
}
