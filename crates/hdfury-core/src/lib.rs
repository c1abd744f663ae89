//! hdfury-core: Core types, model registry, and error definitions for hdfury.
//!
//! This crate holds everything about HDFury devices that does not touch a
//! socket: the per-model capability tables, the abstract command intents a
//! host can request, the snapshot a session publishes, and the persisted
//! device configuration.
//!
//! # Key types
//!
//! - [`ModelConfig`] / [`ModelId`] -- static per-model capabilities and dialect
//! - [`Intent`] -- a model-independent command request
//! - [`SessionSnapshot`] / [`SessionObserver`] -- state change notifications
//! - [`DeviceStore`] / [`JsonFileStore`] -- persisted device configuration
//! - [`Error`] / [`Result`] -- error handling

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod types;

pub use config::{device_id_for_host, DeviceConfig, DeviceStore, JsonFileStore};
pub use error::{Error, Result};
pub use events::{NullObserver, SessionObserver, SessionSnapshot};
pub use models::{Dialect, MatrixStyle, ModelConfig, ModelId, ParseModelError, SourceStyle};
pub use types::*;
