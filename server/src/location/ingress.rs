//! Location ingestion: validate, stamp, persist, fan out.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::AppError;
use crate::location::{now_millis, LocationUpdate};
use crate::state::AppState;
use crate::ws::broadcast::{self, PublishOutcome};

/// Core ingest operation, shared by the HTTP handler and tests.
///
/// Order matters: validation happens before anything else, and a storage
/// failure skips the broadcast so subscribers never see an update that was
/// not persisted. Returns once the fan-out has been dispatched; individual
/// subscriber deliveries are handled by each connection's writer task.
pub async fn ingest(state: &AppState, mut update: LocationUpdate) -> Result<PublishOutcome, AppError> {
    update.validate()?;

    // Server is the only time authority. Caller-supplied timestamps are discarded.
    update.updated_at = Some(now_millis());

    state.locations.put(&update).await?;

    let outcome = broadcast::publish(&state.subscribers, &update.entity_id, &update);
    tracing::debug!(
        entity_id = %update.entity_id,
        delivered = outcome.delivered,
        pruned = outcome.pruned,
        "Location update ingested"
    );
    Ok(outcome)
}

/// POST /locations — vendor position report.
/// 204 on success; 400 on out-of-range fields; 500 if persistence fails.
pub async fn upsert_location(
    State(state): State<AppState>,
    Json(update): Json<LocationUpdate>,
) -> Result<StatusCode, AppError> {
    ingest(&state, update).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /locations/{entity_id} — latest persisted position, or 404.
pub async fn get_latest(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> Result<Json<LocationUpdate>, AppError> {
    match state.locations.get_latest(&entity_id).await? {
        Some(update) => Ok(Json(update)),
        None => Err(AppError::NotFound),
    }
}
