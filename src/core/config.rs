//! Session configuration from environment variables.
//!
//! Load with `Config::from_env()`; every field has a usable default so the
//! core works without any environment at all (tests, embedded use).

/// Defaults applied when the environment is silent.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAYLOAD_WARN_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the schema backend, e.g. `https://api.internal/semantic`.
    pub api_base_url: Option<String>,

    /// Per-request timeout for transport operations.
    pub request_timeout_secs: u64,

    /// Soft warning threshold for the save payload. Nothing is hard-capped.
    pub payload_warn_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            api_base_url: std::env::var("SEMASCHEMA_API_URL").ok(),
            request_timeout_secs: std::env::var("SEMASCHEMA_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            payload_warn_bytes: std::env::var("SEMASCHEMA_PAYLOAD_WARN_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PAYLOAD_WARN_BYTES),
        }
    }

    /// Check if a backend is configured.
    pub fn has_api(&self) -> bool {
        self.api_base_url.is_some()
    }

    /// Get the backend URL or panic with a helpful message.
    pub fn api_base_url_or_panic(&self) -> &str {
        self.api_base_url
            .as_deref()
            .expect("SEMASCHEMA_API_URL environment variable is not set")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            payload_warn_bytes: DEFAULT_PAYLOAD_WARN_BYTES,
        }
    }
}
