//! # parley-server
//!
//! The Parley HTTP API: chat, single-shot language tasks and document
//! question answering over axum.
//!
//! ```rust,ignore
//! let config = parley_server::AppConfig::from_env()?;
//! parley_server::run_server(config).await?;
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use state::{AppState, MAX_UPLOAD_BYTES, build_state};

/// Room for multipart framing and the `metadata` field on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Request deadline used by [`app_router`].
pub const DEFAULT_SERVER_TIMEOUT: Duration = Duration::from_secs(190);

/// The API routes with [`DEFAULT_SERVER_TIMEOUT`].
pub fn app_router(state: AppState) -> Router {
    app_router_with_timeout(state, DEFAULT_SERVER_TIMEOUT)
}

pub fn app_router_with_timeout(state: AppState, timeout: Duration) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES));

    Router::new()
        .route("/api/chat", post(handlers::chat::chat))
        .route("/api/summarize", post(handlers::tasks::summarize_text))
        .route("/api/sentiment", post(handlers::tasks::sentiment))
        .route("/api/generate-code", post(handlers::tasks::generate))
        .route("/api/upload-document", post(handlers::documents::upload_document).layer(upload_limit))
        .route("/api/ask-question", post(handlers::documents::ask_question))
        .route("/api/document-stats", get(handlers::documents::document_stats))
        .route(
            "/api/conversation",
            get(handlers::chat::conversation_summary).delete(handlers::chat::clear_conversation),
        )
        .route("/api/health", get(handlers::health::health))
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Build the backends, verify them, restore the index and serve until Ctrl-C.
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let state = build_state(&config).await.context("failed to configure backends")?;

    if config.verify_on_startup {
        let reply = parley_chat::check_connection(state.backend.as_ref())
            .await
            .context("backend verification failed")?;
        info!(reply = %reply, "backend verified");
    }

    if let Some(dir) = &config.index_path {
        if state.documents.restore(dir).await.context("failed to restore index")? {
            let stats = state.documents.get_stats().await;
            info!(
                path = %dir.display(),
                document_count = stats.document_count,
                chunk_count = stats.chunk_count,
                "index restored"
            );
        } else {
            warn!(path = %dir.display(), "no index snapshot found, starting empty");
        }
    }

    let addr = config.socket_addr()?;
    let app = app_router_with_timeout(state, config.server_timeout());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("parley listening on http://{}", addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
