//! Periodic liveness checking and reconnection.
//!
//! The liveness task wakes every keep-alive interval. It stays out of the
//! way of real traffic: if a command is executing or queued it does
//! nothing. Otherwise, once the session has gone longer than the idle
//! threshold without a successful command, it sends a heartbeat.
//!
//! A single failed heartbeat is tolerated; the second consecutive failure
//! marks the session unavailable and starts a bounded reconnection sequence
//! with escalating delays. Reconnection counts only when the dial succeeds
//! and a heartbeat on the new socket gets an answer.

use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use hdfury_core::error::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::session::Shared;

/// Consecutive heartbeat failures before the session is marked unavailable.
pub const HEARTBEAT_FAILURE_LIMIT: u32 = 2;

/// Decide whether a liveness cycle should probe the device.
pub fn should_probe(
    in_flight: bool,
    queue_depth: usize,
    idle: Duration,
    threshold: Duration,
) -> bool {
    !in_flight && queue_depth == 0 && idle > threshold
}

/// Run until cancelled.
pub(crate) async fn run(shared: Arc<Shared>, cancel: CancellationToken) {
    info!(device = %shared.device_id, "Starting liveness loop");
    drive(
        &shared.device_id,
        shared.config.keep_alive_interval,
        shared.config.cool_down,
        &cancel,
        || cycle(&shared, &cancel),
    )
    .await;
    info!(device = %shared.device_id, "Liveness loop stopped");
}

/// Sleep `interval`, run one `step`, repeat. A failed step is logged and
/// followed by `cool_down`. Cancellation interrupts the sleeps and any
/// step in progress.
pub(crate) async fn drive<F, Fut>(
    device: &str,
    interval: Duration,
    cool_down: Duration,
    cancel: &CancellationToken,
    mut step: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    loop {
        if !sleep_or_cancel(interval, cancel).await {
            return;
        }

        let outcome = tokio::select! {
            biased;

            _ = cancel.cancelled() => return,
            outcome = step() => outcome,
        };

        if let Err(e) = outcome {
            error!(device = %device, error = %e, "Liveness check failed");
            if !sleep_or_cancel(cool_down, cancel).await {
                return;
            }
        }
    }
}

/// Sleep for `duration`. Returns `false` if cancelled first.
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;

        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// One liveness check: probe an idle connection and, once the failure
/// limit is reached, mark the session unavailable and reconnect.
pub(crate) async fn cycle(shared: &Shared, cancel: &CancellationToken) -> Result<()> {
    let activity = &shared.activity;
    if !should_probe(
        activity.in_flight(),
        activity.depth(),
        activity.idle(),
        shared.config.idle_threshold,
    ) {
        return Ok(());
    }

    if shared.is_available().await {
        debug!(
            device = %shared.device_id,
            idle_secs = activity.idle().as_secs(),
            "Connection idle, checking health"
        );
        if shared.client.heartbeat().await {
            shared.heartbeat_failures.store(0, Ordering::Release);
            activity.mark_success();
            return Ok(());
        }

        let failures = shared.heartbeat_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures < HEARTBEAT_FAILURE_LIMIT {
            warn!(
                device = %shared.device_id,
                failures,
                "Heartbeat failed, allowing a grace cycle"
            );
            return Ok(());
        }

        // A caller's command may have started while the probe ran.
        if activity.in_flight() {
            debug!(device = %shared.device_id, "Command in flight, deferring unavailable");
            return Ok(());
        }

        warn!(device = %shared.device_id, "Connection lost");
        shared.mark_unavailable("Connection Lost", "Reconnecting").await;
    }

    if reconnect(shared, cancel).await? {
        shared.heartbeat_failures.store(0, Ordering::Release);
    }
    Ok(())
}

/// Try to re-establish the connection, waiting before each attempt.
/// Returns whether the session is available again.
pub(crate) async fn reconnect(shared: &Shared, cancel: &CancellationToken) -> Result<bool> {
    let attempts = shared.config.reconnect_delays.len();

    for (i, delay) in shared.config.reconnect_delays.iter().enumerate() {
        if !sleep_or_cancel(*delay, cancel).await {
            return Ok(false);
        }

        // A caller's command may have redialed during the delay.
        if shared.is_available().await && shared.client.is_connected() {
            info!(device = %shared.device_id, "Connection restored by traffic");
            return Ok(true);
        }

        let attempt = i + 1;
        info!(device = %shared.device_id, attempt, attempts, "Reconnecting");
        shared.client.disconnect().await;

        match shared.client.connect().await {
            Ok(()) => {}
            Err(e) if e.is_retryable() => {
                warn!(device = %shared.device_id, attempt, error = %e, "Reconnection failed");
                continue;
            }
            Err(e) => return Err(e),
        }

        if shared.client.heartbeat().await {
            shared.activity.mark_success();
            shared.mark_available().await;
            info!(device = %shared.device_id, attempt, "Reconnected");
            return Ok(true);
        }
        warn!(device = %shared.device_id, attempt, "Reconnected but heartbeat failed");
    }

    warn!(device = %shared.device_id, attempts, "Reconnection attempts exhausted");
    Ok(false)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Instant;

    use hdfury_core::error::Error;

    use super::*;

    const THRESHOLD: Duration = Duration::from_secs(1200);

    #[test]
    fn probes_only_when_idle_and_quiet() {
        assert!(should_probe(false, 0, Duration::from_secs(1201), THRESHOLD));
        assert!(!should_probe(false, 0, Duration::from_secs(10), THRESHOLD));
        assert!(!should_probe(false, 0, THRESHOLD, THRESHOLD));
    }

    #[test]
    fn traffic_suppresses_probe() {
        let idle = Duration::from_secs(5000);
        assert!(!should_probe(true, 0, idle, THRESHOLD));
        assert!(!should_probe(false, 1, idle, THRESHOLD));
        assert!(!should_probe(true, 3, idle, THRESHOLD));
    }

    // ---------------------------------------------------------------
    // Loop driver
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn failed_step_cools_down_then_continues() {
        let cancel = CancellationToken::new();
        let calls = Mutex::new(Vec::new());
        let interval = Duration::from_millis(10);
        let cool_down = Duration::from_millis(200);

        let log = &calls;
        let driver = drive("test", interval, cool_down, &cancel, move || async move {
            let mut calls = log.lock().unwrap();
            calls.push(Instant::now());
            if calls.len() == 1 {
                Err(Error::Protocol("boom".into()))
            } else {
                Ok(())
            }
        });
        let stopper = async {
            tokio::time::sleep(Duration::from_millis(400)).await;
            cancel.cancel();
        };
        tokio::join!(driver, stopper);

        let calls = calls.into_inner().unwrap();
        assert!(calls.len() >= 3, "loop kept running after the error");
        assert!(calls[1].duration_since(calls[0]) >= cool_down + interval);
        assert!(calls[2].duration_since(calls[1]) < cool_down);
    }

    #[tokio::test]
    async fn cancel_interrupts_running_step() {
        let cancel = CancellationToken::new();
        let driver = drive(
            "test",
            Duration::from_millis(10),
            Duration::from_secs(60),
            &cancel,
            || async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            },
        );
        let stopper = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        };

        let started = Instant::now();
        tokio::join!(driver, stopper);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
