//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                GET   健康检查
//! - /api/content/put         POST  写入/更新正文（上游生产者边界）
//! - /api/content/get         POST  获取正文详情
//! - /api/content/list        GET   列出所有正文
//! - /api/voice/put           POST  登记音色
//! - /api/voice/list          GET   列出所有音色
//! - /api/chunk/list          POST  获取已生成分块的元数据
//! - /api/chunk/audio/...     GET   获取单个分块音频字节
//! - /api/generate            POST  触发后台生成（立即返回）
//! - /api/process_next        POST  预生成调度（一个有界工作单元）

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/content", content_routes())
        .nest("/voice", voice_routes())
        .nest("/chunk", chunk_routes())
        .route("/generate", post(handlers::generate))
        .route("/process_next", post(handlers::process_next))
}

/// Content 路由
fn content_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/put", post(handlers::put_content))
        .route("/get", post(handlers::get_content))
        .route("/list", get(handlers::list_contents))
}

/// Voice 路由
fn voice_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/put", post(handlers::put_voice))
        .route("/list", get(handlers::list_voices))
}

/// Chunk 路由
fn chunk_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/list", post(handlers::list_chunks))
        .route(
            "/audio/:content_id/:voice/:index",
            get(handlers::get_chunk_audio),
        )
}
