//! Application layer use cases for the client.
//!
//! - **`poll_monitor`** – Enables the monitor at startup, re-enables it
//!   whenever a device change has silently disabled it, and disables it again
//!   on exit. The transport is injected as a `MonitorDevice` trait object.

pub mod poll_monitor;
