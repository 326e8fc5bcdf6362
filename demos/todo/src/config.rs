//! Demo configuration
//!
//! | Variable          | Meaning                                          |
//! |-------------------|--------------------------------------------------|
//! | `TODO_LATENCY_MS` | Artificial delay of the in-memory backend        |
//! | `TODO_ERROR_MODE` | Start the in-memory backend in error mode        |
//! | `METRICS_ADDR`    | Install the Prometheus recorder, e.g. `0.0.0.0:9090` |
//!
//! Dispatcher settings (`OPTIMISTIC_API_URL`, `OPTIMISTIC_CALL_TIMEOUT_MS`) come
//! from [`DispatcherConfig::from_env`].

use crate::api::DEFAULT_API_URL;
use optimistic_runtime::DispatcherConfig;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Demo configuration
#[derive(Debug, Clone)]
pub struct TodoConfig {
    /// Delay applied by the in-memory backend to every call
    pub latency: Duration,
    /// Whether the in-memory backend starts in error mode
    pub error_mode: bool,
    /// Where to advertise Prometheus metrics, if anywhere
    pub metrics_addr: Option<SocketAddr>,
    /// Dispatcher settings; `api_url` selects the HTTP backend
    pub dispatcher: DispatcherConfig,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(300),
            error_mode: false,
            metrics_addr: None,
            dispatcher: DispatcherConfig::default(),
        }
    }
}

impl TodoConfig {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            latency: env::var("TODO_LATENCY_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map_or(defaults.latency, Duration::from_millis),
            error_mode: env::var("TODO_ERROR_MODE")
                .ok()
                .is_some_and(|s| parse_flag(&s)),
            metrics_addr: env::var("METRICS_ADDR").ok().and_then(|s| s.parse().ok()),
            dispatcher: DispatcherConfig::from_env(),
        }
    }

    /// Base URL endpoints are registered under
    #[must_use]
    pub fn api_url(&self) -> &str {
        self.dispatcher.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    /// Whether calls go to a real HTTP backend
    #[must_use]
    pub const fn uses_http(&self) -> bool {
        self.dispatcher.api_url.is_some()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
