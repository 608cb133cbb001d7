pub mod actor;
pub mod broadcast;
pub mod handler;
pub mod registry;

use tokio::sync::mpsc;

pub use registry::{ConnectionId, Subscriber, SubscriberRegistry};

/// Type alias for the sender half of a WebSocket connection's channel.
/// The broadcaster pushes messages to a subscriber through this; the
/// connection's writer task owns the socket and drains the channel.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;
