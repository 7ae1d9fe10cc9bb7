//! Protocol module containing device names, control codes, the reply codec,
//! and the packet sequence counter.

pub mod codec;
pub mod control;
pub mod sequence;

pub use codec::{ProtocolError, QueryMonitorReply};
pub use control::*;
pub use sequence::PacketSequence;
