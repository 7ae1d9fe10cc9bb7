//! Infrastructure layer of the engine.
//!
//! Contains the adapters around the state machine: the hook facility
//! contract (and its in-process implementation), the packet logging seam,
//! and the control-code gateway.

pub mod control_gateway;
pub mod hook_facility;
pub mod packet_log;
