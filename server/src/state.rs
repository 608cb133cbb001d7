use tokio::sync::watch;

use crate::config::LiveConfig;
use crate::location::store::LocationStore;
use crate::ws::SubscriberRegistry;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Latest-location persistence
    pub locations: LocationStore,
    /// Live WebSocket subscriber connections per entity
    pub subscribers: SubscriberRegistry,
    /// Fan-out tuning (ping cadence, send timeout, replay flag)
    pub live: LiveConfig,
    /// Flips to true on server shutdown; every connection actor watches it
    pub shutdown: watch::Receiver<bool>,
}
