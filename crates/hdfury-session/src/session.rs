//! Device session: lifecycle, dispatch, and the published snapshot.
//!
//! A [`DeviceSession`] owns one [`HdfuryClient`] and the two background
//! tasks that use it: the command queue worker and the liveness loop.
//! Callers hand it [`Intent`]s through [`handle_command`](DeviceSession::handle_command)
//! and get back a [`StatusCode`]; every state-relevant transition is
//! reported to the session's [`SessionObserver`] as a fresh
//! [`SessionSnapshot`].
//!
//! ```text
//! UNAVAILABLE --start ok--> AVAILABLE --probe/command failure--> UNAVAILABLE
//!      ^                                                              |
//!      +------------------------reconnect ok--------------------------+
//! ```

use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use hdfury_client::HdfuryClient;
use hdfury_core::{Availability, Intent, SessionObserver, SessionSnapshot, StatusCode};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::liveness;
use crate::queue::{Activity, CommandQueue};

/// Mutable display state, published through snapshots.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionState {
    pub availability: Availability,
    pub title: String,
    pub subtitle: String,
    pub detail: String,
    pub source_list: Vec<String>,
    pub current_source: Option<String>,
}

/// State shared between the session and its background tasks.
pub(crate) struct Shared {
    pub device_id: String,
    pub name: String,
    pub client: Arc<HdfuryClient>,
    pub activity: Arc<Activity>,
    pub config: SessionConfig,
    pub observer: Arc<dyn SessionObserver>,
    pub state: Mutex<SessionState>,
    /// Consecutive failed liveness heartbeats.
    pub heartbeat_failures: AtomicU32,
}

impl Shared {
    pub async fn is_available(&self) -> bool {
        self.state.lock().await.availability == Availability::Available
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            device_id: self.device_id.clone(),
            name: self.name.clone(),
            availability: state.availability,
            title: state.title.clone(),
            subtitle: state.subtitle.clone(),
            detail: state.detail.clone(),
            source_list: state.source_list.clone(),
            current_source: state.current_source.clone(),
        }
    }

    /// Apply `f` to the state, then notify the observer.
    pub async fn update(&self, f: impl FnOnce(&mut SessionState)) {
        {
            let mut state = self.state.lock().await;
            f(&mut state);
        }
        self.notify().await;
    }

    pub async fn notify(&self) {
        let snapshot = self.snapshot().await;
        self.observer.state_updated(&snapshot);
    }

    pub async fn mark_available(&self) {
        self.update(|s| {
            s.availability = Availability::Available;
            s.title = "Ready".to_string();
            s.subtitle.clear();
        })
        .await;
    }

    pub async fn mark_unavailable(&self, title: &str, subtitle: &str) {
        self.update(|s| {
            s.availability = Availability::Unavailable;
            s.title = title.to_string();
            s.subtitle = subtitle.to_string();
        })
        .await;
    }
}

/// One configured HDFury device.
pub struct DeviceSession {
    shared: Arc<Shared>,
    queue: Mutex<Option<CommandQueue>>,
    liveness: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl DeviceSession {
    pub(crate) fn new(
        device_id: String,
        name: String,
        client: HdfuryClient,
        config: SessionConfig,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let state = SessionState {
            title: "Disconnected".to_string(),
            source_list: client.model().source_list(),
            ..SessionState::default()
        };
        DeviceSession {
            shared: Arc::new(Shared {
                device_id,
                name,
                client: Arc::new(client),
                activity: Arc::new(Activity::new()),
                config,
                observer,
                state: Mutex::new(state),
                heartbeat_failures: AtomicU32::new(0),
            }),
            queue: Mutex::new(None),
            liveness: Mutex::new(None),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.shared.device_id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn client(&self) -> &Arc<HdfuryClient> {
        &self.shared.client
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshot().await
    }

    pub async fn is_available(&self) -> bool {
        self.shared.is_available().await
    }

    /// Bring the session up: start the command worker, connect, and on
    /// success schedule the liveness loop. Always notifies the observer.
    pub async fn start(&self) {
        info!(
            device = %self.shared.device_id,
            addr = %self.shared.client.addr(),
            "Starting session"
        );
        self.ensure_worker().await;

        match self.shared.client.connect().await {
            Ok(()) => {
                self.shared.activity.mark_success();
                self.ensure_liveness().await;
                self.shared.mark_available().await;
            }
            Err(e) => {
                error!(device = %self.shared.device_id, error = %e, "Session connection error");
                let detail = e.to_string();
                self.shared
                    .update(move |s| {
                        s.availability = Availability::Unavailable;
                        s.title = "Connection Error".to_string();
                        s.subtitle.clear();
                        s.detail = detail;
                    })
                    .await;
            }
        }
    }

    /// Tear the session down: cancel and await the liveness loop and the
    /// command worker, disconnect, and mark the session unavailable.
    pub async fn stop(&self) {
        info!(device = %self.shared.device_id, "Stopping session");

        if let Some((cancel, task)) = self.liveness.lock().await.take() {
            cancel.cancel();
            if let Err(e) = task.await {
                error!(error = %e, "liveness task panicked");
            }
        }
        if let Some(queue) = self.queue.lock().await.take() {
            queue.shutdown().await;
        }
        if self.shared.client.is_connected() {
            self.shared.client.disconnect().await;
        }

        self.shared.mark_unavailable("Disconnected", "").await;
    }

    async fn ensure_worker(&self) {
        let mut queue = self.queue.lock().await;
        if queue.as_ref().is_some_and(CommandQueue::is_running) {
            return;
        }
        if let Some(stale) = queue.take() {
            stale.shutdown().await;
        }
        *queue = Some(CommandQueue::spawn(
            Arc::clone(&self.shared.client),
            Arc::clone(&self.shared.activity),
            self.shared.config.min_command_spacing,
            self.shared.config.queue_wait,
        ));
    }

    async fn ensure_liveness(&self) {
        let mut liveness = self.liveness.lock().await;
        if liveness.as_ref().is_some_and(|(_, task)| !task.is_finished()) {
            return;
        }
        let cancel = CancellationToken::new();
        let task = tokio::spawn(liveness::run(Arc::clone(&self.shared), cancel.clone()));
        *liveness = Some((cancel, task));
    }

    /// Execute a command intent through the queue.
    ///
    /// A missing intent, or a source name not in the model's source list,
    /// is a [`StatusCode::BadRequest`]. The session must have been started.
    pub async fn handle_command(&self, intent: Option<Intent>) -> StatusCode {
        let Some(intent) = intent else {
            error!(device = %self.shared.device_id, "Received command without an intent");
            return StatusCode::BadRequest;
        };

        if let Intent::SelectSource(source) | Intent::RouteMatrix { source, .. } = &intent {
            let known = self.shared.state.lock().await.source_list.contains(source);
            if !known {
                warn!(device = %self.shared.device_id, source = %source, "Unknown source");
                return StatusCode::BadRequest;
            }
        }

        let handle = match self.queue.lock().await.as_ref() {
            Some(queue) => queue.handle(),
            None => {
                warn!(device = %self.shared.device_id, "Command received before start");
                return StatusCode::ServiceUnavailable;
            }
        };

        info!(device = %self.shared.device_id, intent = ?intent, "Handling command");
        match handle.submit(intent.clone()).await {
            Ok(reply) => {
                debug!(device = %self.shared.device_id, reply = %reply, "Command succeeded");
                self.shared
                    .update(|s| {
                        match &intent {
                            Intent::SelectSource(source) => {
                                s.current_source = Some(source.clone());
                            }
                            i if i.is_query() => s.detail = reply,
                            _ => {}
                        }
                        if s.availability == Availability::Unavailable {
                            s.availability = Availability::Available;
                            s.title = "Ready".to_string();
                            s.subtitle.clear();
                        }
                    })
                    .await;
                StatusCode::Ok
            }
            Err(e) => {
                warn!(device = %self.shared.device_id, error = %e, "Command failed");
                // The client disconnects once its retry is spent.
                if e.is_retryable() && !self.shared.client.is_connected() {
                    self.shared
                        .mark_unavailable("Connection Lost", "Reconnecting")
                        .await;
                }
                StatusCode::from_error(&e)
            }
        }
    }
}
