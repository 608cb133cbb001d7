use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Gerobak live-location server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "gerobak-server", version, about = "Gerobak live-location server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "GEROBAK_PORT", default_value = "8080")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "GEROBAK_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./gerobak.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "GEROBAK_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for persistent state (latest-location DB)
    #[arg(long, env = "GEROBAK_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Live-location fan-out configuration (loaded from [live] section in TOML)
    #[arg(skip)]
    #[serde(default = "default_live_config")]
    pub live: Option<LiveConfig>,
}

/// Configuration for the live-location WebSocket fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Seconds between server-initiated pings on each subscriber connection (default: 30)
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    /// Seconds to wait for a pong before dropping a subscriber (default: 10)
    #[serde(default = "default_pong_timeout")]
    pub pong_timeout_secs: u64,

    /// Per-message socket send timeout in seconds (default: 5)
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,

    /// Send the latest persisted location to a subscriber immediately on
    /// connect instead of waiting for the next vendor update (default: false)
    #[serde(default)]
    pub replay_last_location: bool,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: 30,
            pong_timeout_secs: 10,
            send_timeout_secs: 5,
            replay_last_location: false,
        }
    }
}

fn default_ping_interval() -> u64 {
    30
}

fn default_pong_timeout() -> u64 {
    10
}

fn default_send_timeout() -> u64 {
    5
}

fn default_live_config() -> Option<LiveConfig> {
    Some(LiveConfig::default())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "0.0.0.0".to_string(),
            config: "./gerobak.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            live: Some(LiveConfig::default()),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (GEROBAK_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("GEROBAK_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Gerobak Live-Location Server Configuration
# Place this file at ./gerobak.toml or specify with --config <path>
# All settings can be overridden via environment variables (GEROBAK_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 8080)
# port = 8080

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the latest-location SQLite database
# data_dir = "./data"

# ---- Live-Location Fan-Out ----
# [live]

# Seconds between server pings on each subscriber connection
# Detects half-open connections that never sent a close frame
# ping_interval_secs = 30

# Seconds to wait for a pong before dropping a subscriber
# pong_timeout_secs = 10

# Per-message socket send timeout in seconds
# A subscriber that cannot drain its socket within this window is dropped
# send_timeout_secs = 5

# Push the latest persisted location to new subscribers on connect
# (default: off -- subscribers see only updates arriving after they join)
# replay_last_location = false
"#
    .to_string()
}
