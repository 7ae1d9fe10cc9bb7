//! mouhid-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! The client is the unprivileged half of the MouHid monitor. It opens the
//! control device, enables packet interception, and polls the monitor state
//! so interception survives mouse hot-plug. Off Windows (or with
//! `--simulate`) it hosts the engine in-process behind the same gateway and
//! feeds it synthetic mouse traffic.

/// Application layer: use cases for the client.
pub mod application;

/// Infrastructure layer: device transports and configuration storage.
pub mod infrastructure;
