use crate::config::Config;
use crate::conversion::Converter;
use crate::store::{start_cleanup_task, start_sweep_task, ResultStore, SessionBindings};
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use utoipa::ToSchema;

pub mod error;
pub mod openapi;
pub mod routes_convert;
pub mod routes_download;
pub mod session;

/// Interval between session binding cleanup passes.
const SESSION_CLEANUP_INTERVAL_SECS: u64 = 300;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Converted batches, bounded by count and age
    pub store: Arc<ResultStore>,
    /// Session token → most recent batch
    pub sessions: SessionBindings,
    pub converter: Converter,
}

impl AppContext {
    /// Build a context with a fresh, empty store and no sessions.
    pub fn new(config: Config) -> Self {
        let store = Arc::new(ResultStore::from_config(&config.store));
        let sessions =
            SessionBindings::new(config.server.session_timeout_hours.saturating_mul(3600));
        let converter = Converter::from_config(&config.conversion);
        Self {
            config: Arc::new(config),
            store,
            sessions,
            converter,
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let body_limit = ctx.config.server.max_upload_bytes;

    let mut app = Router::new()
        .route("/health", get(health_check))
        .merge(routes_convert::convert_routes())
        .merge(routes_download::download_routes())
        // Swagger UI at /api-docs
        .merge(openapi::openapi_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // Landing page; unknown paths fall back to index.html
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(ServeFile::new(index_path)),
            );
        }
    }

    app
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `healthy` while the process is serving
    pub status: &'static str,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse { status: "healthy" })
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let static_dir = config.server.static_dir.clone();
    let sweep_interval = config.store.sweep_interval_secs;
    let ctx = AppContext::new(config);

    let sweeper = start_sweep_task(ctx.store.clone(), sweep_interval);
    let cleaner = start_cleanup_task(ctx.sessions.clone(), SESSION_CLEANUP_INTERVAL_SECS);

    tracing::info!(
        max_batches = ctx.store.capacity(),
        max_upload_bytes = ctx.config.server.max_upload_bytes,
        "Result store ready"
    );

    let app = create_router(ctx, static_dir);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    cleaner.abort();

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
