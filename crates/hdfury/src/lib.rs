//! # hdfury -- Resilient control of HDFury AV-over-IP devices
//!
//! `hdfury` is an asynchronous Rust library for driving HDFury video
//! processors, switchers, and eARC hubs (VRRooM, VERTEX2, VERTEX, DIVA,
//! Maestro, Arcana2, Dr.HDMI 8K) over their TCP text protocol. It is meant
//! for home-automation hosts that keep a session open for weeks.
//!
//! ## Quick Start
//!
//! ```no_run
//! use hdfury::{models, Intent, SessionBuilder, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = SessionBuilder::new(models::vrroom())
//!         .host("192.168.1.100")
//!         .build()?;
//!     session.start().await;
//!
//!     let status = session
//!         .handle_command(Some(Intent::SelectSource("HDMI 2".into())))
//!         .await;
//!     assert_eq!(status, StatusCode::Ok);
//!
//!     session.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                 | Purpose                                          |
//! |-----------------------|--------------------------------------------------|
//! | `hdfury-core`         | Models, intents, errors, snapshots, device store |
//! | `hdfury-client`       | Command builders and the TCP protocol client     |
//! | `hdfury-session`      | Command queue, liveness loop, device session     |
//! | **`hdfury`**          | This facade crate -- re-exports everything       |
//!
//! ## Observing a session
//!
//! Every state transition produces a [`SessionSnapshot`]. Any
//! `mpsc::UnboundedSender<SessionSnapshot>` is a [`SessionObserver`]:
//!
//! ```no_run
//! use hdfury::{models, SessionBuilder};
//! # async fn example() -> hdfury::Result<()> {
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let session = SessionBuilder::new(models::diva())
//!     .host("10.0.0.5")
//!     .observer(tx)
//!     .build()?;
//! session.start().await;
//! while let Some(snapshot) = rx.recv().await {
//!     println!("{}: {} ({})", snapshot.name, snapshot.title, snapshot.availability);
//! }
//! # Ok(())
//! # }
//! ```

pub use hdfury_core::*;

pub use hdfury_client::{commands, normalize_reply, ClientOptions, HdfuryClient};
pub use hdfury_session::{
    Activity, CommandQueue, DeviceSession, QueueHandle, SessionBuilder, SessionConfig,
};

/// Liveness policy helpers.
pub mod liveness {
    pub use hdfury_session::liveness::{should_probe, HEARTBEAT_FAILURE_LIMIT};
}

/// Every supported model family, in display order.
///
/// ```
/// for model in hdfury::supported_models() {
///     let id = model.id.as_str();
///     println!("{id:<10} {:<12} port {}", model.display_name, model.default_port);
/// }
/// ```
pub fn supported_models() -> Vec<ModelConfig> {
    models::all()
}
