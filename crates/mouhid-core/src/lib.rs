//! # mouhid-core
//!
//! Shared library for the MouHid input monitor containing the control-code
//! protocol, the raw mouse packet layout, and the status taxonomy.
//!
//! This crate is used by both the privileged engine (`mouhid-monitor`) and the
//! polling client (`mouhid-client`). It has no dependencies on OS APIs.
//!
//! # Architecture overview
//!
//! The monitor observes every raw mouse packet delivered by the mouse class
//! driver, tags it with a sequence number, and logs it before handing the
//! packet on untouched. A small client toggles this interception on and off
//! through three control codes.
//!
//! - **`packet`** – The `MOUSE_INPUT_DATA` layout delivered by the class driver.
//! - **`protocol`** – Device names, control codes, reply codec, and the
//!   per-registration packet sequence.
//! - **`status`** – Errors that cross the control boundary and their
//!   NTSTATUS values.

pub mod packet;
pub mod protocol;
pub mod status;

pub use packet::MouseInputPacket;
pub use protocol::codec::{ProtocolError, QueryMonitorReply};
pub use protocol::control::ControlCode;
pub use protocol::sequence::PacketSequence;
pub use status::MonitorError;
