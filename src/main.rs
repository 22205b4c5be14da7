//! Narra - 长文本分块朗读（TTS）服务
//!
//! - Domain: 纯函数分块器
//! - Application: ports + 生成服务（generator/dispatcher/scheduler）
//! - Infrastructure: http, persistence, adapters

use std::sync::Arc;
use std::time::Duration;

use narra::application::generation::{
    ChunkGenerator, GenerationDispatcher, GenerationTracker, GeneratorConfig, PregenScheduler,
    SchedulerConfig,
};
use narra::config::{load_config, print_config};
use narra::infrastructure::adapters::{HttpSpeechClient, HttpSpeechClientConfig};
use narra::infrastructure::http::{AppState, HttpServer, ServerConfig};
use narra::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteChunkStore, SqliteContentRepository,
    SqliteVoiceCatalog,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!(
        "{},narra={},tower_http=debug",
        config.log.level, config.log.level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("Narra - 长文本分块朗读服务");
    print_config(&config);

    // 确保数据目录存在
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // 初始化数据库
    let db_config = DatabaseConfig {
        database_url: config.database.database_url(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    // 创建持久化适配器
    let content_repo = Arc::new(SqliteContentRepository::new(pool.clone()));
    let voice_catalog = Arc::new(SqliteVoiceCatalog::new(pool.clone()));
    let chunk_store = Arc::new(SqliteChunkStore::new(pool.clone()));

    // 创建语音合成客户端
    let mut provider_config = HttpSpeechClientConfig::new(config.provider.url.clone())
        .with_timeout(config.provider.timeout_secs);
    provider_config.api_key = config.provider.api_key.clone();
    let speech_provider = Arc::new(HttpSpeechClient::new(provider_config)?);

    // 创建生成服务
    let generator_config = GeneratorConfig {
        max_chunk_chars: config.splitter.max_chunk_chars,
        max_attempts: config.provider.max_attempts,
        default_backoff: Duration::from_millis(config.provider.default_backoff_ms),
        pacing_delay: Duration::from_millis(config.provider.pacing_ms),
    };
    let generator = Arc::new(ChunkGenerator::new(
        generator_config,
        chunk_store.clone(),
        speech_provider.clone(),
    ));
    let dispatcher = Arc::new(GenerationDispatcher::new(
        generator,
        content_repo.clone(),
        Arc::new(GenerationTracker::new()),
    ));
    let scheduler = Arc::new(PregenScheduler::new(
        SchedulerConfig {
            window_size: config.scheduler.window_size,
            max_chunk_chars: config.splitter.max_chunk_chars,
        },
        content_repo.clone(),
        voice_catalog.clone(),
        chunk_store.clone(),
        dispatcher.clone(),
    ));

    // 创建 HTTP 服务器
    let server_config = ServerConfig::new(&config.server.host, config.server.port);
    let state = AppState::new(
        content_repo,
        voice_catalog,
        chunk_store,
        speech_provider,
        dispatcher,
        scheduler,
    );

    let server = HttpServer::new(server_config, state);

    tracing::info!("Starting HTTP server...");

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for ctrl-c");
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
