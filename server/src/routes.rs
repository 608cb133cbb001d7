use axum::{Router, routing};
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::location::ingress;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Rate limiting on the ingest route, sized for periodic GPS reporting:
    // sustained 1 update/sec per IP with a burst allowance for clients that
    // flush a backlog after regaining connectivity.
    // Uses PeerIpKeyExtractor which reads from ConnectInfo<SocketAddr>
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(1)
            .burst_size(30)
            .finish()
            .expect("Failed to build governor config"),
    );
    let governor_limiter = governor_config.limiter().clone();

    // Spawn background task to clean up rate limiter state
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            governor_limiter.retain_recent();
        }
    });

    // Vendor position reports, rate limited per IP
    let ingest_routes = Router::new()
        .route("/locations", routing::post(ingress::upsert_location))
        .layer(GovernorLayer {
            config: governor_config,
        });

    // Latest-location reads (no rate limiting — customer-facing polling)
    let read_routes = Router::new()
        .route("/locations/{entity_id}", routing::get(ingress::get_latest));

    // Streaming subscribe endpoint
    let ws_routes = Router::new()
        .route("/locations/ws/{entity_id}", routing::get(ws_handler::ws_subscribe));

    // Health check
    let health = Router::new().route("/health", routing::get(health_check));

    Router::new()
        .merge(ingest_routes)
        .merge(read_routes)
        .merge(ws_routes)
        .merge(health)
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
