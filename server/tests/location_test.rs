//! Integration tests for the location REST API: ingest, latest-read,
//! validation, and server-side timestamping.

use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use tokio::sync::watch;

use gerobak_server::config::LiveConfig;
use gerobak_server::location::store::LocationStore;
use gerobak_server::state::AppState;
use gerobak_server::ws::SubscriberRegistry;

/// Helper: start the server on a random port.
/// Returns (base_url, addr, state, shutdown_tx) — keep the sender alive
/// for the duration of the test or connection actors will shut down.
async fn start_test_server() -> (String, SocketAddr, AppState, watch::Sender<bool>) {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = gerobak_server::db::init_db(&data_dir).expect("Failed to init DB");
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let state = AppState {
        locations: LocationStore::new(db),
        subscribers: SubscriberRegistry::new(),
        live: LiveConfig::default(),
        shutdown: shutdown_rx,
    };

    let app = gerobak_server::routes::build_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    let base_url = format!("http://{}", addr);
    (base_url, addr, state, shutdown_tx)
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[tokio::test]
async fn test_post_then_get_latest() {
    let (base_url, _addr, _state, _shutdown_tx) = start_test_server().await;
    let client = reqwest::Client::new();

    let before = now_millis();
    let resp = client
        .post(format!("{}/locations", base_url))
        .json(&serde_json::json!({
            "uid": "v301",
            "lat": -6.2443,
            "lng": 106.8385,
            "accuracy": 12.5,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    let resp = client
        .get(format!("{}/locations/v301", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["uid"], "v301");
    assert_eq!(body["lat"], -6.2443);
    assert_eq!(body["lng"], 106.8385);
    assert_eq!(body["accuracy"], 12.5);

    let updated_at = body["updatedAt"].as_i64().expect("updatedAt missing");
    assert!(
        updated_at >= before && updated_at <= now_millis(),
        "updatedAt {} should be stamped at ingest time",
        updated_at
    );
}

#[tokio::test]
async fn test_get_latest_unknown_entity_is_404() {
    let (base_url, _addr, _state, _shutdown_tx) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/locations/v404", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_out_of_range_latitude_rejected_before_persistence() {
    let (base_url, _addr, _state, _shutdown_tx) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/locations", base_url))
        .json(&serde_json::json!({
            "uid": "v301",
            "lat": 95.0,
            "lng": 106.8385,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Nothing was persisted
    let resp = client
        .get(format!("{}/locations/v301", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_out_of_range_optional_fields_rejected() {
    let (base_url, _addr, _state, _shutdown_tx) = start_test_server().await;
    let client = reqwest::Client::new();

    for body in [
        serde_json::json!({"uid": "v301", "lat": 0.0, "lng": 0.0, "heading": 400.0}),
        serde_json::json!({"uid": "v301", "lat": 0.0, "lng": 0.0, "speed": -3.0}),
        serde_json::json!({"uid": "v301", "lat": 0.0, "lng": 0.0, "accuracy": -1.0}),
        serde_json::json!({"uid": "", "lat": 0.0, "lng": 0.0}),
    ] {
        let resp = client
            .post(format!("{}/locations", base_url))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "expected rejection for {}", body);
    }
}

#[tokio::test]
async fn test_caller_supplied_timestamp_is_overwritten() {
    let (base_url, _addr, _state, _shutdown_tx) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/locations", base_url))
        .json(&serde_json::json!({
            "uid": "v301",
            "lat": 1.0,
            "lng": 2.0,
            "updatedAt": 12345,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    let body: serde_json::Value = client
        .get(format!("{}/locations/v301", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let updated_at = body["updatedAt"].as_i64().unwrap();
    assert_ne!(updated_at, 12345, "server must not trust caller timestamps");
    assert!(updated_at > now_millis() - 5_000);
}

#[tokio::test]
async fn test_repeat_post_replaces_latest() {
    let (base_url, _addr, _state, _shutdown_tx) = start_test_server().await;
    let client = reqwest::Client::new();

    for (lat, lng) in [(-6.2443, 106.8385), (-6.2001, 106.8167)] {
        let resp = client
            .post(format!("{}/locations", base_url))
            .json(&serde_json::json!({"uid": "v301", "lat": lat, "lng": lng}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 204);
    }

    let body: serde_json::Value = client
        .get(format!("{}/locations/v301", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["lat"], -6.2001);
    assert_eq!(body["lng"], 106.8167);
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let (base_url, _addr, _state, _shutdown_tx) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/locations", base_url))
        .header("content-type", "application/json")
        .body("{\"lat\": \"not a number\"}")
        .send()
        .await
        .unwrap();
    assert!(
        resp.status().is_client_error(),
        "expected 4xx, got {}",
        resp.status()
    );
}

#[tokio::test]
async fn test_health_endpoint() {
    let (base_url, _addr, _state, _shutdown_tx) = start_test_server().await;

    let resp = reqwest::get(format!("{}/health", base_url)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}
