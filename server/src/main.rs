use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;

use gerobak_server::config::{generate_config_template, Config};
use gerobak_server::location::store::LocationStore;
use gerobak_server::ws::SubscriberRegistry;
use gerobak_server::{db, routes, state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "gerobak_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "gerobak_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("Gerobak server v{} starting", env!("CARGO_PKG_VERSION"));

    // Initialize the latest-location SQLite database
    let db = db::init_db(&config.data_dir)?;
    let locations = LocationStore::new(db);

    // Live subscriber registry, shared between the WS actors and the
    // ingest path's broadcaster
    let subscribers = SubscriberRegistry::new();

    // Shutdown signal watched by every connection actor
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let app_state = state::AppState {
        locations,
        subscribers: subscribers.clone(),
        live: config.live.clone().unwrap_or_default(),
        shutdown: shutdown_rx,
    };

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_tx))
    .await?;

    // Final sweep: anything still registered gets closed and dropped here,
    // even if an individual actor failed to run its cleanup tail.
    let lingering = subscribers.close_all();
    if lingering > 0 {
        tracing::info!("Closed {} lingering subscriber connections", lingering);
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for ctrl-c or SIGTERM, then flip the shutdown watch so every
/// connection actor closes its socket and deregisters.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { tracing::info!("Received Ctrl+C signal"); }
        _ = terminate => { tracing::info!("Received terminate signal"); }
    }

    tracing::info!("Initiating graceful shutdown");
    let _ = shutdown_tx.send(true);
}
