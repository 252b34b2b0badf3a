//! HTTP request handlers
//!
//! REST endpoints for queue management, transport control and settings.
//! Handler failures map to a `(status, StatusResponse)` pair; playback-flow
//! failures never surface here - they become per-item error status instead.

use crate::api::server::AppContext;
use crate::api::types::*;
use crate::playback::QueueItem;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info};

type HandlerError = (StatusCode, Json<StatusResponse>);

fn internal_error(e: impl std::fmt::Display) -> HandlerError {
    error!("request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(StatusResponse::error(e)),
    )
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "speakq_player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Queue endpoints
// ============================================================================

/// POST /playback/enqueue - append a batch of messages
pub async fn enqueue(
    State(ctx): State<AppContext>,
    Json(req): Json<EnqueueRequest>,
) -> Result<Json<EnqueueResponse>, HandlerError> {
    let items: Vec<QueueItem> = req
        .items
        .into_iter()
        .filter(|item| !item.text.trim().is_empty())
        .map(|item| {
            let group_label = item.group_label.unwrap_or_else(|| item.source_id.clone());
            QueueItem::new(item.source_id, item.message_id, item.text, group_label)
        })
        .collect();

    let enqueued = items.len();
    if enqueued > 0 {
        info!("Enqueue request: {} items", enqueued);
        ctx.handle.enqueue(items).map_err(internal_error)?;
    }

    Ok(Json(EnqueueResponse { enqueued }))
}

/// GET /playback/queue - list queue contents
pub async fn get_queue(State(ctx): State<AppContext>) -> Json<QueueResponse> {
    let queue = ctx.handle.queue();
    let queue = queue.read().await;
    Json(QueueResponse {
        items: queue.snapshot(),
        cursor: queue.cursor(),
        exhausted: queue.is_exhausted(),
    })
}

/// DELETE /playback/queue/:item_id - remove one item
pub async fn remove_from_queue(
    State(ctx): State<AppContext>,
    Path(item_id): Path<String>,
) -> Result<Json<StatusResponse>, HandlerError> {
    ctx.handle.remove(item_id).map_err(internal_error)?;
    Ok(Json(StatusResponse::ok()))
}

/// POST /playback/queue/clear - empty the queue
pub async fn clear_queue(
    State(ctx): State<AppContext>,
) -> Result<Json<StatusResponse>, HandlerError> {
    ctx.handle.clear().map_err(internal_error)?;
    Ok(Json(StatusResponse::ok()))
}

/// POST /playback/queue/jump - move the cursor to an index
pub async fn jump_to(
    State(ctx): State<AppContext>,
    Json(req): Json<JumpRequest>,
) -> Result<Json<StatusResponse>, HandlerError> {
    ctx.handle.jump_to(req.index).map_err(internal_error)?;
    Ok(Json(StatusResponse::ok()))
}

// ============================================================================
// Transport endpoints
// ============================================================================

/// POST /playback/play
pub async fn play(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, HandlerError> {
    ctx.handle.play().map_err(internal_error)?;
    Ok(Json(StatusResponse::ok()))
}

/// POST /playback/pause
pub async fn pause(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, HandlerError> {
    ctx.handle.pause().map_err(internal_error)?;
    Ok(Json(StatusResponse::ok()))
}

/// POST /playback/next
pub async fn skip_next(
    State(ctx): State<AppContext>,
) -> Result<Json<StatusResponse>, HandlerError> {
    ctx.handle.skip_next().map_err(internal_error)?;
    Ok(Json(StatusResponse::ok()))
}

/// POST /playback/previous
pub async fn skip_previous(
    State(ctx): State<AppContext>,
) -> Result<Json<StatusResponse>, HandlerError> {
    ctx.handle.skip_previous().map_err(internal_error)?;
    Ok(Json(StatusResponse::ok()))
}

/// POST /playback/seek
pub async fn seek(
    State(ctx): State<AppContext>,
    Json(req): Json<SeekRequest>,
) -> Result<Json<StatusResponse>, HandlerError> {
    ctx.handle
        .seek(req.position_ms as f64 / 1000.0)
        .map_err(internal_error)?;
    Ok(Json(StatusResponse::ok()))
}

/// POST /playback/retry - retry synthesis for the current errored item
pub async fn retry(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, HandlerError> {
    ctx.handle.retry().map_err(internal_error)?;
    Ok(Json(StatusResponse::ok()))
}

/// GET /playback/state
pub async fn get_playback_state(State(ctx): State<AppContext>) -> Json<PlaybackStateResponse> {
    let state = ctx.handle.state();
    let playback_state = state.get_playback_state().await;
    let current = state.get_current_item().await.map(|c| CurrentItemResponse {
        item_id: c.item_id,
        group_label: c.group_label,
        position_ms: c.position_ms,
        duration_ms: c.duration_ms,
    });

    Json(PlaybackStateResponse {
        state: match playback_state {
            crate::state::PlaybackState::Playing => "playing".to_string(),
            crate::state::PlaybackState::Paused => "paused".to_string(),
        },
        current,
        volume: state.get_volume().await,
        rate: state.get_rate().await,
        voice_id: state.get_voice().await,
    })
}

// ============================================================================
// Settings endpoints
// ============================================================================

/// GET /audio/volume
pub async fn get_volume(State(ctx): State<AppContext>) -> Json<VolumeResponse> {
    Json(VolumeResponse {
        volume: ctx.handle.state().get_volume().await,
    })
}

/// POST /audio/volume
pub async fn set_volume(
    State(ctx): State<AppContext>,
    Json(req): Json<VolumeRequest>,
) -> Result<Json<StatusResponse>, HandlerError> {
    ctx.handle.set_volume(req.volume).map_err(internal_error)?;
    Ok(Json(StatusResponse::ok()))
}

/// GET /playback/rate
pub async fn get_rate(State(ctx): State<AppContext>) -> Json<RateResponse> {
    Json(RateResponse {
        rate: ctx.handle.state().get_rate().await,
    })
}

/// POST /playback/rate
pub async fn set_rate(
    State(ctx): State<AppContext>,
    Json(req): Json<RateRequest>,
) -> Result<Json<StatusResponse>, HandlerError> {
    ctx.handle.set_rate(req.rate).map_err(internal_error)?;
    Ok(Json(StatusResponse::ok()))
}

/// GET /synth/voice
pub async fn get_voice(State(ctx): State<AppContext>) -> Json<VoiceResponse> {
    Json(VoiceResponse {
        voice_id: ctx.handle.state().get_voice().await,
    })
}

/// POST /synth/voice
pub async fn set_voice(
    State(ctx): State<AppContext>,
    Json(req): Json<VoiceRequest>,
) -> Result<Json<StatusResponse>, HandlerError> {
    ctx.handle.set_voice(req.voice_id).map_err(internal_error)?;
    Ok(Json(StatusResponse::ok()))
}
