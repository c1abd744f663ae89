//! hdfury-client: TCP protocol client for HDFury devices.
//!
//! This crate talks to one device over its line-oriented text protocol:
//!
//! - [`commands`]: pure, model-aware builders that turn operations into
//!   command lines (`set inseltx0 2`, `set edidaudio stereo`, ...)
//! - [`HdfuryClient`]: the persistent connection, with per-command timeouts,
//!   proactive reconnect of idle sockets, and a single retry on timeouts and
//!   connection errors
//!
//! # Example
//!
//! ```no_run
//! use hdfury_client::{ClientOptions, HdfuryClient};
//! use hdfury_core::models;
//! use std::time::Duration;
//!
//! # async fn example() -> hdfury_core::Result<()> {
//! let options = ClientOptions {
//!     query_timeout: Duration::from_secs(3),
//!     ..ClientOptions::default()
//! };
//! let client = HdfuryClient::with_options("192.168.1.100", 2222, models::vrroom(), options);
//!
//! client.set_edid_mode("automix").await?;
//! println!("{}", client.firmware_version().await?);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod commands;

pub use client::{normalize_reply, ClientOptions, HdfuryClient};
