//! Voice HTTP Handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::ports::VoiceProfile;
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PutVoiceRequest {
    pub name: String,
    pub locale: String,
    pub gender: String,
}

#[derive(Debug, Serialize)]
pub struct VoiceResponse {
    pub name: String,
    pub locale: String,
    pub gender: String,
}

/// 登记音色
pub async fn put_voice(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PutVoiceRequest>,
) -> Result<Json<ApiResponse<VoiceResponse>>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Voice name is empty".to_string()));
    }

    let voice = VoiceProfile {
        name: req.name,
        locale: req.locale,
        gender: req.gender,
    };
    state.voice_catalog.upsert(&voice).await?;

    tracing::info!(voice = %voice.name, locale = %voice.locale, "Voice registered");

    Ok(Json(ApiResponse::success(VoiceResponse {
        name: voice.name,
        locale: voice.locale,
        gender: voice.gender,
    })))
}

/// 列出所有音色
pub async fn list_voices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<VoiceResponse>>>, ApiError> {
    let voices = state.voice_catalog.list().await?;

    let responses: Vec<VoiceResponse> = voices
        .into_iter()
        .map(|v| VoiceResponse {
            name: v.name,
            locale: v.locale,
            gender: v.gender,
        })
        .collect();

    Ok(Json(ApiResponse::success(responses)))
}
