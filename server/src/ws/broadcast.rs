//! Fan-out of location updates to subscribed viewers.

use axum::extract::ws::Message;

use crate::location::LocationUpdate;
use crate::ws::SubscriberRegistry;

/// Aggregated result of one publish call. Per-connection failures never
/// propagate; they show up here as the pruned count.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishOutcome {
    pub delivered: usize,
    pub pruned: usize,
}

/// Deliver a location update to every live subscriber of an entity.
///
/// Takes a snapshot first, then iterates outside the registry lock.
/// Delivery is an enqueue onto each connection's outbound channel — the
/// socket write happens in that connection's writer task, so one slow
/// subscriber cannot delay the others or this caller. A failed enqueue
/// means the connection's writer is gone: the connection is closed
/// best-effort and removed so it is never retried on a later publish.
pub fn publish(
    registry: &SubscriberRegistry,
    entity_id: &str,
    update: &LocationUpdate,
) -> PublishOutcome {
    let payload = match serde_json::to_string(update) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(entity_id = %entity_id, error = %e, "Failed to serialize location update");
            return PublishOutcome::default();
        }
    };

    let snapshot = registry.snapshot(entity_id);
    let mut outcome = PublishOutcome::default();

    for subscriber in snapshot {
        let msg = Message::Text(payload.clone().into());
        if subscriber.send(msg).is_ok() {
            outcome.delivered += 1;
        } else {
            subscriber.close();
            registry.unsubscribe(entity_id, subscriber.id);
            outcome.pruned += 1;
        }
    }

    if outcome.pruned > 0 {
        tracing::debug!(
            entity_id = %entity_id,
            pruned = outcome.pruned,
            "Dropped dead subscriber connections during broadcast"
        );
    }

    outcome
}
