use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::state::AppState;
use crate::ws::Subscriber;

/// Run the actor-per-connection pattern for a location subscriber.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Reader task: waits for disconnect; no client payloads are expected
///
/// The mpsc sender is what the broadcaster holds via the registry — any
/// publish for this entity enqueues here and the writer task drains it.
pub async fn run_connection(socket: WebSocket, state: AppState, entity_id: String) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    // Register this connection in the subscriber registry
    let subscriber = Subscriber::new(tx.clone());
    let connection_id = subscriber.id;
    state.subscribers.subscribe(&entity_id, subscriber);

    // Optional: seed the new subscriber with the latest persisted position
    // so the map pin is not blank until the vendor next reports.
    if state.live.replay_last_location {
        match state.locations.get_latest(&entity_id).await {
            Ok(Some(latest)) => {
                if let Ok(json) = serde_json::to_string(&latest) {
                    let _ = tx.send(Message::Text(json.into()));
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(entity_id = %entity_id, error = %e, "Failed to load replay location");
            }
        }
    }

    tracing::info!(entity_id = %entity_id, "Location subscriber connected");

    // Spawn writer task: forwards mpsc messages to the WebSocket sink
    let send_timeout = Duration::from_secs(state.live.send_timeout_secs);
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx, send_timeout));

    // Track pong reception
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();

    // Spawn ping task: sends periodic pings and monitors pong responses.
    // Exits when the peer stops answering or the writer dies; the reader
    // loop below watches for that exit, so a half-open connection that
    // never sends anything still gets torn down.
    let ping_tx = tx.clone();
    let ping_interval = Duration::from_secs(state.live.ping_interval_secs);
    let pong_timeout = Duration::from_secs(state.live.pong_timeout_secs);
    let mut ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(ping_interval);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died — connection is gone
                break;
            }

            match timeout(pong_timeout, pong_rx.recv()).await {
                Ok(Some(())) => {
                    // Pong received, continue
                }
                _ => {
                    tracing::warn!("Pong timeout, closing connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    // Reader loop: wait for the terminating condition. The subscriber is
    // passive — all outbound data arrives via the broadcaster.
    let mut shutdown = state.shutdown.clone();
    loop {
        tokio::select! {
            // Server shutdown: close promptly and fall through to cleanup
            _ = shutdown.changed() => {
                tracing::info!(entity_id = %entity_id, "Closing subscriber for server shutdown");
                let _ = tx.send(Message::Close(Some(CloseFrame {
                    code: 1001,
                    reason: "Server shutting down".into(),
                })));
                break;
            }
            // Ping task gave up on the peer (or the writer died)
            _ = &mut ping_handle => {
                break;
            }
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(msg)) => match msg {
                    Message::Ping(data) => {
                        let _ = tx.send(Message::Pong(data));
                    }
                    Message::Pong(_) => {
                        let _ = pong_tx.send(());
                    }
                    Message::Close(frame) => {
                        tracing::info!(
                            entity_id = %entity_id,
                            reason = ?frame,
                            "Client initiated close"
                        );
                        break;
                    }
                    Message::Text(_) | Message::Binary(_) => {
                        // Subscribers have nothing to say to us
                        tracing::debug!(entity_id = %entity_id, "Ignoring unexpected client payload");
                    }
                },
                Some(Err(e)) => {
                    tracing::warn!(entity_id = %entity_id, error = %e, "WebSocket receive error");
                    break;
                }
                None => {
                    tracing::info!(entity_id = %entity_id, "WebSocket stream ended");
                    break;
                }
            }
        }
    }

    // Cleanup. Deregister first so the broadcaster stops handing out this
    // connection, then drop every sender so the writer drains whatever is
    // queued (a close frame included) and exits on its own. unsubscribe is
    // idempotent, so a broadcaster-side prune racing this tail is harmless.
    ping_handle.abort();
    state.subscribers.unsubscribe(&entity_id, connection_id);
    drop(tx);
    let _ = timeout(Duration::from_secs(1), writer_handle).await;

    tracing::info!(entity_id = %entity_id, "Location subscriber disconnected");
}

/// Writer task: receives messages from the mpsc channel and forwards them to
/// the WebSocket sink. A send that errors or exceeds the timeout ends the
/// task; the next publish then prunes this connection from the registry.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
    send_timeout: Duration,
) {
    while let Some(msg) = rx.recv().await {
        match timeout(send_timeout, ws_sender.send(msg)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                // WebSocket send failed — connection is broken
                break;
            }
            Err(_) => {
                tracing::warn!("Socket send timed out, dropping connection");
                break;
            }
        }
    }
}
