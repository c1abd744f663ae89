//! Device sessions for HDFury devices.
//!
//! A session wraps one [`HdfuryClient`](hdfury_client::HdfuryClient) with
//! the machinery that keeps it usable for a long-running host:
//!
//! - [`queue`]: one worker task that executes commands in FIFO order with a
//!   minimum spacing between them, and a bounded wait for each caller
//! - [`liveness`]: periodic heartbeats on an idle connection, a grace cycle
//!   for a single missed probe, and bounded reconnection with escalating
//!   delays
//! - [`session`]: lifecycle (`start`/`stop`), command dispatch with status
//!   codes, and snapshot notifications to a
//!   [`SessionObserver`](hdfury_core::SessionObserver)
//! - [`builder`]: fluent construction from a model or a persisted
//!   [`DeviceConfig`](hdfury_core::DeviceConfig)

pub mod builder;
pub mod config;
pub mod liveness;
pub mod queue;
pub mod session;

pub use builder::SessionBuilder;
pub use config::SessionConfig;
pub use queue::{Activity, CommandQueue, QueueHandle};
pub use session::DeviceSession;
