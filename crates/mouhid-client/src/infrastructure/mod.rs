//! Infrastructure layer for the client.
//!
//! **Dependency rule**: this layer may depend on `application`, `mouhid_core`
//! and `mouhid_monitor`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`device`** – Implementations of `MonitorDevice`: the Windows control
//!   device, the in-process gateway, and the simulated mouse hardware that
//!   drives it.
//!
//! - **`storage`** – TOML configuration file persistence.

pub mod device;
pub mod storage;
