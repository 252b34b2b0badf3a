//! HTTP server setup and routing
//!
//! Axum HTTP server with routes for control endpoints and SSE.

use crate::error::{Error, Result};
use crate::playback::OrchestratorHandle;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application context passed to all handlers
///
/// Clone gives us `FromRef<AppContext>` for free via Axum's blanket
/// implementation.
#[derive(Clone)]
pub struct AppContext {
    pub handle: OrchestratorHandle,
}

/// Build the API router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Queue management
        .route("/playback/enqueue", post(super::handlers::enqueue))
        .route("/playback/queue", get(super::handlers::get_queue))
        .route(
            "/playback/queue/:item_id",
            delete(super::handlers::remove_from_queue),
        )
        .route("/playback/queue/clear", post(super::handlers::clear_queue))
        .route("/playback/queue/jump", post(super::handlers::jump_to))
        // Transport control
        .route("/playback/play", post(super::handlers::play))
        .route("/playback/pause", post(super::handlers::pause))
        .route("/playback/next", post(super::handlers::skip_next))
        .route("/playback/previous", post(super::handlers::skip_previous))
        .route("/playback/seek", post(super::handlers::seek))
        .route("/playback/retry", post(super::handlers::retry))
        .route("/playback/state", get(super::handlers::get_playback_state))
        // Settings
        .route("/audio/volume", get(super::handlers::get_volume))
        .route("/audio/volume", post(super::handlers::set_volume))
        .route("/playback/rate", get(super::handlers::get_rate))
        .route("/playback/rate", post(super::handlers::set_rate))
        .route("/synth/voice", get(super::handlers::get_voice))
        .route("/synth/voice", post(super::handlers::set_voice))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Run the HTTP API server until the shutdown future resolves
pub async fn run(
    port: u16,
    handle: OrchestratorHandle,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let ctx = AppContext { handle };
    let app = create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("server error: {}", e)))?;

    Ok(())
}
