//! recap-gateway: HTTP surface for the transcription pipeline.
//!
//! Routes:
//! - `POST /transcribe` — multipart upload, returns transcript + summary
//! - `GET /health` — liveness only
//!
//! CORS is one declarative allow-list applied once per request; it never
//! touches pipeline logic.

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use recap_config::{ConfigError, RecapConfig, ServerConfig, TranscriptionProvider};
use recap_media::UploadStore;
use recap_pipeline::Pipeline;
use recap_providers::types::{SummaryModel, TranscriptionEngine};
use recap_providers::{
    AssemblyAiEngine, OpenRouterSummarizer, WhisperApiEngine, WhisperLocalEngine,
};

/// Shared request state.
pub struct GatewayState {
    pub pipeline: Pipeline,
    pub max_upload_bytes: u64,
}

/// Wire the configured providers into a pipeline.
pub fn build_pipeline(config: &RecapConfig) -> Result<Pipeline, Box<dyn std::error::Error>> {
    let t = &config.transcription;
    let engine: Arc<dyn TranscriptionEngine> = match t.provider {
        TranscriptionProvider::AssemblyAi => Arc::new(AssemblyAiEngine::new(
            t.assemblyai_api_key
                .clone()
                .ok_or(ConfigError::MissingVar("ASSEMBLYAI_API_KEY"))?,
            t.timeout,
        )),
        TranscriptionProvider::WhisperApi => Arc::new(WhisperApiEngine::new(
            t.openai_api_key
                .clone()
                .ok_or(ConfigError::MissingVar("OPENAI_API_KEY"))?,
            t.timeout,
        )),
        TranscriptionProvider::WhisperLocal => Arc::new(WhisperLocalEngine::new(
            t.whisper_bin
                .clone()
                .ok_or(ConfigError::MissingVar("WHISPER_BIN"))?,
            t.whisper_model
                .clone()
                .ok_or(ConfigError::MissingVar("WHISPER_MODEL"))?,
            t.timeout,
        )),
    };

    let summarizer: Arc<dyn SummaryModel> = Arc::new(OpenRouterSummarizer::new(
        config.summary.api_key.clone(),
        config.summary.base_url.clone(),
        config.summary.model.clone(),
        config.summary.max_tokens,
        config.summary.timeout,
    ));

    let store = UploadStore::new(config.server.upload_dir.clone())?;
    Ok(Pipeline::new(engine, summarizer, store, config.ffmpeg_timeout))
}

/// Build the router. Separate from [`start_server`] so tests can drive it
/// without binding a socket.
pub fn router(state: Arc<GatewayState>, server: &ServerConfig) -> Router {
    let body_limit = server.max_upload_bytes as usize;
    Router::new()
        .route("/health", get(handlers::health))
        .route("/transcribe", post(handlers::transcribe))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&server.cors_allowed_origins))
        .with_state(state)
}

/// Start the HTTP server. Main entry point for `recap serve`.
pub async fn start_server(config: RecapConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = build_pipeline(&config)?;
    let state = Arc::new(GatewayState {
        pipeline,
        max_upload_bytes: config.server.max_upload_bytes,
    });
    let app = router(state, &config.server);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("recap listening on {addr}");
    info!("  Transcribe: POST http://{addr}/transcribe");
    info!("  Health:     GET  http://{addr}/health");
    info!(
        provider = config.transcription.provider.as_str(),
        model = %config.summary.model,
        max_upload_mb = config.server.max_upload_mb(),
        "providers configured"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}
