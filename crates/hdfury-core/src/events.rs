//! Session state notifications.
//!
//! A device session reports every state-relevant transition (connect,
//! disconnect, reconnect, successful command) by handing a fresh
//! [`SessionSnapshot`] to its [`SessionObserver`]. The host integration
//! projects the snapshot into whatever entity model it uses.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::types::Availability;

/// Point-in-time view of a device session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Stable identifier of the device (e.g. `hdfury-192-168-1-100`).
    pub device_id: String,
    /// Friendly name (e.g. `HDFury VRRooM`).
    pub name: String,
    pub availability: Availability,
    /// Primary status line (e.g. `Ready`, `Connection Lost`).
    pub title: String,
    pub subtitle: String,
    /// Last query reply or diagnostic detail.
    pub detail: String,
    pub source_list: Vec<String>,
    pub current_source: Option<String>,
}

impl SessionSnapshot {
    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }
}

/// Receives a snapshot after every state transition of a session.
///
/// Implementations must not block; the session calls this from its own
/// tasks.
pub trait SessionObserver: Send + Sync + 'static {
    fn state_updated(&self, snapshot: &SessionSnapshot);
}

/// Observer that discards every notification.
pub struct NullObserver;

impl SessionObserver for NullObserver {
    fn state_updated(&self, _snapshot: &SessionSnapshot) {}
}

/// Forward snapshots into a channel. A closed receiver is ignored.
impl SessionObserver for mpsc::UnboundedSender<SessionSnapshot> {
    fn state_updated(&self, snapshot: &SessionSnapshot) {
        let _ = self.send(snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            device_id: "hdfury-10-0-0-5".into(),
            name: "HDFury VRRooM".into(),
            availability: Availability::Available,
            title: "Ready".into(),
            subtitle: String::new(),
            detail: String::new(),
            source_list: vec!["HDMI 0".into()],
            current_source: None,
        }
    }

    #[test]
    fn channel_observer_forwards() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.state_updated(&snapshot());
        let got = rx.try_recv().unwrap();
        assert!(got.is_available());
        assert_eq!(got.title, "Ready");
    }

    #[test]
    fn channel_observer_ignores_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        tx.state_updated(&snapshot());
    }

    #[test]
    fn snapshot_serializes() {
        let json = serde_json::to_value(snapshot()).unwrap();
        assert_eq!(json["availability"], "available");
        assert_eq!(json["source_list"][0], "HDMI 0");
    }
}
