//! Recon HTTP Server
//!
//! Axum-based server: image upload, static serving of uploads and crops, and
//! a WebSocket endpoint that runs one geolocation session per request frame.

mod frame;
mod handlers;
mod sink;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geolocator::ENHANCED_RECON_PROMPT;
use recon_core::{AgentBuilder, LlmProvider};
use recon_runtime::{GeminiProvider, ReconConfig};

use crate::handlers::{health_check, upload_file, ws_handler};
use crate::state::AppState;

/// Build the router over shared state
fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let upload_limit = DefaultBodyLimit::max(state.config.upload_limit_bytes);

    Router::new()
        .route("/health", get(health_check))
        .route("/upload", post(upload_file).layer(upload_limit))
        .route("/ws", get(ws_handler))
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_state(config: ReconConfig) -> anyhow::Result<AppState> {
    let provider = Arc::new(GeminiProvider::from_recon(&config)?);
    let tools = geolocator::tavily_toolbox(
        config.tavily_api_key.as_deref().unwrap_or_default(),
        &config.tavily_base_url,
        config.http_timeout,
    )?;

    let agent = AgentBuilder::new()
        .provider(provider)
        .tools(tools)
        .system_prompt(ENHANCED_RECON_PROMPT)
        .model(config.model.clone())
        .max_turns(config.max_turns)
        .coordinate_space(config.coordinate_space)
        .retention(config.retention)
        .build()?;

    Ok(AppState {
        agent: Arc::new(agent),
        config: Arc::new(config),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ReconConfig::from_env();
    tracing::debug!(?config, "configuration loaded");

    let missing = config.missing_keys();
    if missing.is_empty() {
        let provider = GeminiProvider::from_recon(&config)?;
        match provider.health_check().await {
            Ok(true) => tracing::info!("✓ Connected to Gemini"),
            Ok(false) | Err(_) => tracing::warn!("⚠ Gemini not reachable - sessions will fail"),
        }
    } else {
        tracing::warn!("⚠ Missing {} - sessions will fail", missing.join(", "));
        tracing::warn!("  Set GEMINI_API_KEY and TAVILY_API_KEY in .env");
    }

    tokio::fs::create_dir_all(&config.static_dir).await?;

    let addr = config.bind_addr.clone();
    let model = config.model.clone();
    let app = router(build_state(config)?);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 Recon server running on http://{}", addr);
    tracing::info!("   Model: {}", model);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health    - Health check");
    tracing::info!("  POST /upload    - Upload target image (multipart 'file')");
    tracing::info!("  GET  /static/*  - Uploaded images and crops");
    tracing::info!("  GET  /ws        - Geolocation sessions");

    axum::serve(listener, app).await?;

    Ok(())
}
