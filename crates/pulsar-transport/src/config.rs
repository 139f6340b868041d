use std::time::Duration;

/// Default endpoint used when none is configured.
pub const DEFAULT_URL: &str = "ws://localhost:8080";

/// Delay before the first reconnect attempt.
pub const DEFAULT_BASE_INTERVAL: Duration = Duration::from_secs(2);

/// Upper bound on the reconnect delay.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Endpoint URL (`ws://` or `wss://` for the WebSocket connector).
    pub url: String,
    /// Reconnect delay after the first unexpected close.
    pub base_interval: Duration,
    /// Cap on the reconnect delay.
    pub max_interval: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            base_interval: DEFAULT_BASE_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
        }
    }
}

impl TransportConfig {
    /// Default configuration for the given endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_base_interval(mut self, interval: Duration) -> Self {
        self.base_interval = interval;
        self
    }

    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Delay before reconnect attempt number `attempt` (1-based).
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        backoff_delay(self.base_interval, self.max_interval, attempt)
    }
}

/// Capped exponential backoff: `min(base * 2^(attempt-1), max)`.
pub fn backoff_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.checked_mul(factor).map_or(max, |delay| delay.min(max))
}
