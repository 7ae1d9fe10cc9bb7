//! mouhid-monitor library entry point.
//!
//! The engine that attaches to the mouse class service callback, tags and
//! logs every packet, and forwards it untouched.
//!
//! # Architecture
//!
//! ```text
//! ControlGateway ──► Monitor::{enable, disable, query}
//!                        │ register / unregister
//!                        ▼
//!                   HookFacility ──► MonitorHooks::on_packet_batch ──► PacketInterceptor
//!                        │                                               └─► original service callback
//!                        └──────► MonitorHooks::on_device_event ──► Monitor (release)
//! ```
//!
//! Integration tests in `tests/` and the client's in-process transport share
//! this module tree.

pub mod application;
pub mod infrastructure;

pub use application::intercept::{CallbackContext, PacketInterceptor};
pub use application::monitor::{Monitor, MonitorOptions};
pub use infrastructure::control_gateway::ControlGateway;
