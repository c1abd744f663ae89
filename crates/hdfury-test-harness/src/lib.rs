//! hdfury-test-harness: Test utilities for hdfury.
//!
//! This crate provides [`MockTcpServer`], a scripted stand-in for an HDFury
//! device that speaks the line protocol on a localhost port, so protocol
//! clients and sessions can be tested without real hardware.

pub mod mock_tcp;

pub use mock_tcp::{MockTcpServer, ReceivedLine, Reply};
