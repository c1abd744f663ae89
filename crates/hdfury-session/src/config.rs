//! Session timing configuration.

use std::time::Duration;

/// Pacing, queue, and liveness settings for a [`DeviceSession`](crate::DeviceSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Minimum gap between the end of one command and the start of the next.
    pub min_command_spacing: Duration,
    /// How long a caller waits for a queued command before giving up.
    pub queue_wait: Duration,
    /// Sleep between liveness checks.
    pub keep_alive_interval: Duration,
    /// Time since the last successful command after which the liveness
    /// task probes the device.
    pub idle_threshold: Duration,
    /// Delay before each reconnection attempt; its length bounds the number
    /// of attempts per outage.
    pub reconnect_delays: Vec<Duration>,
    /// Pause after an unexpected liveness error.
    pub cool_down: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            min_command_spacing: Duration::from_millis(500),
            queue_wait: Duration::from_secs(12),
            keep_alive_interval: Duration::from_secs(600),
            idle_threshold: Duration::from_secs(1200),
            reconnect_delays: [5, 10, 30, 60, 300]
                .into_iter()
                .map(Duration::from_secs)
                .collect(),
            cool_down: Duration::from_secs(60),
        }
    }
}
