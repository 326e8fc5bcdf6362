//! Runtime configuration
//!
//! Both configs are plain builder structs with sensible defaults.
//! [`DispatcherConfig::from_env`] reads overrides from the environment:
//!
//! | Variable                      | Meaning                                |
//! |-------------------------------|----------------------------------------|
//! | `OPTIMISTIC_API_URL`          | URL prefix for registered endpoints    |
//! | `OPTIMISTIC_CALL_TIMEOUT_MS`  | Per-call timeout; `0` disables it      |

use optimistic_core::ViolationPolicy;
use std::env;
use std::time::Duration;

/// Configuration for [`Store`](crate::Store) instances
///
/// # Example
///
/// ```
/// use optimistic_core::ViolationPolicy;
/// use optimistic_runtime::StoreConfig;
///
/// let config = StoreConfig::default()
///     .with_policy(ViolationPolicy::Lenient)
///     .with_broadcast_capacity(256);
/// assert_eq!(config.broadcast_capacity, 256);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How the reconciler treats unmatched resolutions and id collisions
    pub policy: ViolationPolicy,
    /// Number of applied actions buffered for slow subscribers
    pub broadcast_capacity: usize,
}

impl StoreConfig {
    /// Set the violation policy
    #[must_use]
    pub const fn with_policy(mut self, policy: ViolationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            policy: ViolationPolicy::default(),
            broadcast_capacity: 16,
        }
    }
}

/// Configuration for [`Dispatcher`](crate::Dispatcher) instances
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// Fail calls that take longer than this with `DispatchError::Timeout`
    pub call_timeout: Option<Duration>,
    /// Base URL of the remote API, used as the registry prefix
    pub api_url: Option<String>,
}

impl DispatcherConfig {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            call_timeout: env::var("OPTIMISTIC_CALL_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            api_url: env::var("OPTIMISTIC_API_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        }
    }

    /// Set the per-call timeout
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Set the remote API base URL
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }
}
