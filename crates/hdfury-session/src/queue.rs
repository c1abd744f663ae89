//! Rate-limited command queue.
//!
//! One worker task per session drains an unbounded FIFO of [`Intent`]s and
//! executes them against the shared [`HdfuryClient`], strictly one at a
//! time, never starting a command sooner than the configured spacing after
//! the previous one finished.
//!
//! Every request carries a oneshot reply slot that the worker resolves
//! exactly once: with the command's outcome, or with
//! [`Error::SessionStopped`] if the queue shuts down first. Callers wait on
//! the slot with a bounded timeout, so a stuck device delays a caller by at
//! most the queue wait.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use hdfury_client::HdfuryClient;
use hdfury_core::error::{Error, Result};
use hdfury_core::Intent;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

/// Traffic bookkeeping shared between the queue worker and the liveness
/// task.
#[derive(Debug)]
pub struct Activity {
    in_flight: AtomicBool,
    depth: AtomicUsize,
    last_success: Mutex<Instant>,
}

impl Activity {
    pub fn new() -> Self {
        Activity {
            in_flight: AtomicBool::new(false),
            depth: AtomicUsize::new(0),
            last_success: Mutex::new(Instant::now()),
        }
    }

    /// True while the worker is executing a command.
    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Requests enqueued but not yet picked up by the worker.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    pub fn mark_success(&self) {
        *self.lock_last_success() = Instant::now();
    }

    /// Time since the last successful command or probe.
    pub fn idle(&self) -> Duration {
        self.lock_last_success().elapsed()
    }

    fn lock_last_success(&self) -> std::sync::MutexGuard<'_, Instant> {
        self.last_success
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Activity {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

struct Job {
    intent: Intent,
    reply: oneshot::Sender<Result<String>>,
}

/// Cloneable submission side of a [`CommandQueue`].
#[derive(Clone)]
pub struct QueueHandle {
    tx: mpsc::UnboundedSender<Job>,
    activity: Arc<Activity>,
    wait: Duration,
}

impl QueueHandle {
    /// Enqueue `intent` and wait for its outcome.
    ///
    /// Returns [`Error::Timeout`] if the worker has not resolved the request
    /// within the queue wait; the command may still run afterwards.
    pub async fn submit(&self, intent: Intent) -> Result<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.activity.depth.fetch_add(1, Ordering::AcqRel);
        if self
            .tx
            .send(Job {
                intent,
                reply: reply_tx,
            })
            .is_err()
        {
            self.activity.depth.fetch_sub(1, Ordering::AcqRel);
            return Err(Error::SessionStopped);
        }

        match tokio::time::timeout(self.wait, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::SessionStopped),
            Err(_) => {
                tracing::error!(
                    wait_ms = self.wait.as_millis(),
                    "Command timed out in queue"
                );
                Err(Error::Timeout)
            }
        }
    }
}

/// The queue worker and its submission handle.
pub struct CommandQueue {
    handle: QueueHandle,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl CommandQueue {
    /// Spawn the worker.
    pub fn spawn(
        client: Arc<HdfuryClient>,
        activity: Arc<Activity>,
        spacing: Duration,
        wait: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(worker(
            client,
            Arc::clone(&activity),
            rx,
            spacing,
            cancel.clone(),
        ));

        CommandQueue {
            handle: QueueHandle { tx, activity, wait },
            cancel,
            task,
        }
    }

    pub fn handle(&self) -> QueueHandle {
        self.handle.clone()
    }

    /// Shorthand for `self.handle().submit(intent)`.
    pub async fn submit(&self, intent: Intent) -> Result<String> {
        self.handle.submit(intent).await
    }

    /// True until the worker exits.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the worker and wait for it to exit. A command in progress is
    /// abandoned and its caller sees [`Error::SessionStopped`], as do all
    /// requests still queued.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "command worker panicked");
        }
    }
}

async fn worker(
    client: Arc<HdfuryClient>,
    activity: Arc<Activity>,
    mut rx: mpsc::UnboundedReceiver<Job>,
    spacing: Duration,
    cancel: CancellationToken,
) {
    debug!(addr = %client.addr(), "command worker started");
    let mut last_finished: Option<Instant> = None;

    loop {
        let job = tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            job = rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };
        // In flight from dequeue, spacing included.
        activity.in_flight.store(true, Ordering::Release);
        activity.depth.fetch_sub(1, Ordering::AcqRel);

        if let Some(finished) = last_finished {
            let elapsed = finished.elapsed();
            if elapsed < spacing {
                let pause = spacing - elapsed;
                debug!(pause_ms = pause.as_millis(), "Rate limiting before command");
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        activity.in_flight.store(false, Ordering::Release);
                        let _ = job.reply.send(Err(Error::SessionStopped));
                        break;
                    }
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        }

        debug!(intent = ?job.intent, "Executing command");
        let result = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                activity.in_flight.store(false, Ordering::Release);
                let _ = job.reply.send(Err(Error::SessionStopped));
                break;
            }
            result = client.execute(&job.intent) => result,
        };
        activity.in_flight.store(false, Ordering::Release);
        last_finished = Some(Instant::now());

        match &result {
            Ok(_) => activity.mark_success(),
            Err(e) => tracing::error!(intent = ?job.intent, error = %e, "Command failed"),
        }

        // The caller may have stopped waiting.
        let _ = job.reply.send(result);
    }

    rx.close();
    while let Ok(job) = rx.try_recv() {
        activity.depth.fetch_sub(1, Ordering::AcqRel);
        let _ = job.reply.send(Err(Error::SessionStopped));
    }
    debug!(addr = %client.addr(), "command worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdfury_client::ClientOptions;
    use hdfury_core::models;
    use hdfury_test_harness::MockTcpServer;

    fn client_for(server: &MockTcpServer, query_timeout: Duration) -> Arc<HdfuryClient> {
        let options = ClientOptions {
            banner_timeout: Duration::from_millis(20),
            set_timeout: query_timeout,
            query_timeout,
            ..ClientOptions::default()
        };
        Arc::new(HdfuryClient::with_options(
            &server.host(),
            server.port(),
            models::vrroom(),
            options,
        ))
    }

    #[test]
    fn activity_tracks_success() {
        let activity = Activity::new();
        assert!(!activity.in_flight());
        assert_eq!(activity.depth(), 0);
        std::thread::sleep(Duration::from_millis(20));
        assert!(activity.idle() >= Duration::from_millis(20));
        activity.mark_success();
        assert!(activity.idle() < Duration::from_millis(20));
    }

    #[tokio::test]
    async fn fifo_order_with_spacing() {
        let server = MockTcpServer::new().await.unwrap();
        server.set_default_reply("OK");

        let spacing = Duration::from_millis(100);
        let queue = CommandQueue::spawn(
            client_for(&server, Duration::from_secs(1)),
            Arc::new(Activity::new()),
            spacing,
            Duration::from_secs(5),
        );

        let handle = queue.handle();
        let (a, b, c) = tokio::join!(
            handle.submit(Intent::SelectSource("HDMI 1".into())),
            handle.submit(Intent::SetCec(true)),
            handle.submit(Intent::Reboot),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        let received = server.received();
        let lines: Vec<&str> = received.iter().map(|r| r.line.as_str()).collect();
        assert_eq!(lines, vec!["set inseltx0 1", "set cec on", "set reboot"]);
        for pair in received.windows(2) {
            assert!(pair[1].at.duration_since(pair[0].at) >= spacing);
        }

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn success_marks_activity() {
        let server = MockTcpServer::new().await.unwrap();
        server.set_default_reply("ver 0.61");

        let activity = Arc::new(Activity::new());
        let queue = CommandQueue::spawn(
            client_for(&server, Duration::from_secs(1)),
            Arc::clone(&activity),
            Duration::ZERO,
            Duration::from_secs(5),
        );
        tokio::time::sleep(Duration::from_millis(30)).await;
        let before = activity.idle();

        assert_eq!(queue.submit(Intent::QueryFirmware).await.unwrap(), "ver 0.61");
        assert!(activity.idle() < before);
        assert!(!activity.in_flight());
        assert_eq!(activity.depth(), 0);
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn spaced_job_counts_as_in_flight() {
        let server = MockTcpServer::new().await.unwrap();
        server.set_default_reply("OK");

        let activity = Arc::new(Activity::new());
        let queue = CommandQueue::spawn(
            client_for(&server, Duration::from_secs(1)),
            Arc::clone(&activity),
            Duration::from_millis(400),
            Duration::from_secs(5),
        );
        queue.submit(Intent::Reboot).await.unwrap();

        let handle = queue.handle();
        let second = tokio::spawn(async move { handle.submit(Intent::Hotplug).await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Dequeued and waiting out the spacing.
        assert_eq!(activity.depth(), 0);
        assert!(activity.in_flight());
        assert_eq!(server.received_lines(), vec!["set reboot"]);

        assert!(second.await.unwrap().is_ok());
        assert!(!activity.in_flight());
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn validation_error_reaches_caller() {
        let server = MockTcpServer::new().await.unwrap();
        let queue = CommandQueue::spawn(
            client_for(&server, Duration::from_secs(1)),
            Arc::new(Activity::new()),
            Duration::ZERO,
            Duration::from_secs(5),
        );

        let err = queue.submit(Intent::FactoryReset(7)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        assert!(queue.is_running());
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn queue_wait_is_bounded() {
        let server = MockTcpServer::new().await.unwrap();
        server.expect_silence("get ver");

        let queue = CommandQueue::spawn(
            client_for(&server, Duration::from_secs(3)),
            Arc::new(Activity::new()),
            Duration::ZERO,
            Duration::from_millis(200),
        );

        let started = Instant::now();
        let err = queue.submit(Intent::QueryFirmware).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(2));
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_resolves_pending_requests() {
        let server = MockTcpServer::new().await.unwrap();
        server.expect_silence("get ver");

        let activity = Arc::new(Activity::new());
        let queue = CommandQueue::spawn(
            client_for(&server, Duration::from_secs(5)),
            Arc::clone(&activity),
            Duration::ZERO,
            Duration::from_secs(10),
        );

        let handle = queue.handle();
        let first = tokio::spawn({
            let handle = handle.clone();
            async move { handle.submit(Intent::QueryFirmware).await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = tokio::spawn(async move { handle.submit(Intent::QueryStatus).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(activity.in_flight());

        queue.shutdown().await;

        assert!(matches!(first.await.unwrap(), Err(Error::SessionStopped)));
        assert!(matches!(second.await.unwrap(), Err(Error::SessionStopped)));
        assert!(!activity.in_flight());
        assert_eq!(activity.depth(), 0);
    }
}
