//! HTTP server: application state, router, and serve loop

pub mod error;
pub mod handlers;

pub use error::ApiError;

use crate::config::ServerConfig;
use crate::error::{RemovalError, Result};
use crate::session::ModelSession;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared per-process state, passed explicitly into every handler
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,
    pub session: Arc<ModelSession>,
    pub http: reqwest::Client,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Build state with the default model session for the configuration
    pub fn new(config: ServerConfig) -> Result<Self> {
        let session = Arc::new(ModelSession::new(&config));
        Self::with_session(config, session)
    }

    /// Build state around an existing session (tests inject mock models here)
    pub fn with_session(config: ServerConfig, session: Arc<ModelSession>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| {
                RemovalError::invalid_config(format!("Failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            config,
            session,
            http,
            started_at: Utc::now(),
        })
    }
}

/// Build the service router.
///
/// CORS is fully open (all origins, methods, headers). The upload route
/// disables the framework body limit because its handler streams with its
/// own cap and answers oversize payloads with 400 rather than a generic 413;
/// the JSON routes keep a hard limit sized for a base64-inflated payload at
/// the cap, so nothing buffers unbounded request bodies.
pub fn create_app(state: Arc<AppState>) -> Router {
    // base64 expands payloads by 4/3, plus slack for the JSON wrapper
    let json_body_limit = state.config.max_upload_bytes / 3 * 4 + 1024;
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/api/remove-bg",
            post(handlers::remove_bg).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/remove-bg-from-url", post(handlers::remove_bg_from_url))
        .route("/api/remove-bg-base64", post(handlers::remove_bg_base64))
        .layer(DefaultBodyLimit::max(json_body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the listener and serve until the process is stopped
pub async fn run(config: ServerConfig) -> Result<()> {
    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(config)?);
    let app = create_app(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(model = %state.session.model_id(), %addr, "Background removal server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
