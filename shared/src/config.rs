//! Environment configuration
//!
//! Every service reads the same handful of settings from the environment.
//! Missing or unparsable values fall back to the defaults below.
//!
//! | variable | default |
//! |----------|---------|
//! | `MAGEN_MONGO_URI` | `mongodb://127.0.0.1:27017` |
//! | `MAGEN_MONGO_DB` | `magen` |
//! | `MAGEN_MONGO_SELECT_TIMEOUT_MS` | `5000` |
//! | `MAGEN_REST_TIMEOUT_MS` | `2000` |
//! | `MAGEN_REST_VERIFY_TLS` | `true` |
//! | `MAGEN_LOG_LEVEL` | `info` |
//! | `MAGEN_LOG_JSON` | `false` |
//! | `MAGEN_LOG_DIR` | unset (console only) |

use std::time::Duration;

pub const DEFAULT_MONGO_URI: &str = "mongodb://127.0.0.1:27017";
pub const DEFAULT_MONGO_DB: &str = "magen";

/// Settings shared by the magen services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagenConfig {
    /// Document database locator
    pub mongo_uri: String,
    /// Database name
    pub mongo_db: String,
    /// How long the driver waits for a usable server
    pub mongo_select_timeout_ms: u64,
    /// Default timeout of REST calls
    pub rest_timeout_ms: u64,
    /// Verify TLS certificates on REST calls
    pub rest_verify_tls: bool,
    /// Log level (e.g. "info", "debug")
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
    /// Directory for rolling log files
    pub log_dir: Option<String>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl MagenConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self {
            mongo_uri: std::env::var("MAGEN_MONGO_URI").unwrap_or_else(|_| DEFAULT_MONGO_URI.into()),
            mongo_db: std::env::var("MAGEN_MONGO_DB").unwrap_or_else(|_| DEFAULT_MONGO_DB.into()),
            mongo_select_timeout_ms: env_or("MAGEN_MONGO_SELECT_TIMEOUT_MS", 5000),
            rest_timeout_ms: env_or("MAGEN_REST_TIMEOUT_MS", 2000),
            rest_verify_tls: env_or("MAGEN_REST_VERIFY_TLS", true),
            log_level: std::env::var("MAGEN_LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_or("MAGEN_LOG_JSON", false),
            log_dir: std::env::var("MAGEN_LOG_DIR").ok().filter(|d| !d.is_empty()),
        }
    }

    /// Apply a `.env` file if present, then read the environment
    pub fn load() -> Self {
        if let Ok(path) = dotenv::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_env()
    }

    pub fn rest_timeout(&self) -> Duration {
        Duration::from_millis(self.rest_timeout_ms)
    }

    pub fn mongo_select_timeout(&self) -> Duration {
        Duration::from_millis(self.mongo_select_timeout_ms)
    }

    pub fn is_json_logging(&self) -> bool {
        self.log_json
    }
}

impl Default for MagenConfig {
    fn default() -> Self {
        Self {
            mongo_uri: DEFAULT_MONGO_URI.into(),
            mongo_db: DEFAULT_MONGO_DB.into(),
            mongo_select_timeout_ms: 5000,
            rest_timeout_ms: 2000,
            rest_verify_tls: true,
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
        }
    }
}
