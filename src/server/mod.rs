use crate::config::Config;
use crate::library::PathRegistry;
use crate::streaming;
use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use marquee_av::{resolve_tool, DurationProbe, Encoder, FfprobeDuration};
use marquee_common::MovieId;
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod routes_library;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Duration prober used for playlists
    pub prober: Arc<dyn DurationProbe>,
    /// Encoder launcher, shared so the concurrency cap is global
    pub encoder: Arc<Encoder>,
}

impl AppContext {
    /// Build the context from configuration, resolving ffmpeg and ffprobe.
    pub fn from_config(config: Config) -> Self {
        let ffprobe = resolve_tool("ffprobe", config.tools.ffprobe_path.as_deref());
        let ffmpeg = resolve_tool("ffmpeg", config.tools.ffmpeg_path.as_deref());
        tracing::debug!("Using ffprobe at {:?}, ffmpeg at {:?}", ffprobe, ffmpeg);

        let encoder = Encoder::new(
            ffmpeg,
            config.encoder.clone(),
            config.streaming.max_concurrent_encodes,
            config.streaming.stall_timeout(),
        );

        Self {
            prober: Arc::new(
                FfprobeDuration::new(ffprobe).with_timeout(config.streaming.stall_timeout()),
            ),
            encoder: Arc::new(encoder),
            config: Arc::new(config),
        }
    }

    /// Read the path registry from disk.
    pub async fn registry(&self) -> marquee_common::Result<PathRegistry> {
        PathRegistry::load(&self.config.library.registry_path()).await
    }

    /// Source file of a movie; 404 if unknown or missing on disk.
    pub async fn resolve_movie(&self, id: MovieId) -> marquee_common::Result<PathBuf> {
        self.registry().await?.resolve(id).await
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::RANGE, header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(routes_library::library_routes())
        .merge(streaming::stream_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Hello World" }))
}

async fn health_check() -> &'static str {
    "ok"
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::from_config(config);
    let app = create_router(ctx);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

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
