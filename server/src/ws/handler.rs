use axum::{
    extract::{Path, State, WebSocketUpgrade},
    response::Response,
};

use crate::state::AppState;
use crate::ws::actor;

/// GET /locations/ws/{entity_id}
/// WebSocket upgrade endpoint. Registers the connection as a live-location
/// subscriber for one vendor and holds it open until the client disconnects
/// or the server shuts down. Clients send no application payloads.
pub async fn ws_subscribe(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    tracing::info!(entity_id = %entity_id, "Location subscriber connecting");
    ws.on_upgrade(move |socket| actor::run_connection(socket, state, entity_id))
}
