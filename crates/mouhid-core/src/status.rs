//! Errors reported across the control boundary.
//!
//! Each variant maps onto the NTSTATUS value the privileged side completes a
//! request with, so logs on both sides of the boundary agree.

use thiserror::Error;

use crate::protocol::codec::ProtocolError;

pub const STATUS_SUCCESS: u32 = 0x0000_0000;
pub const STATUS_UNSUCCESSFUL: u32 = 0xC000_0001;
pub const STATUS_INVALID_PARAMETER: u32 = 0xC000_000D;
pub const STATUS_INSUFFICIENT_RESOURCES: u32 = 0xC000_009A;
pub const STATUS_INVALID_BUFFER_SIZE: u32 = 0xC000_0206;
pub const STATUS_ALREADY_REGISTERED: u32 = 0xC000_0718;

/// Error type for monitor operations and control requests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MonitorError {
    /// Enable was requested while a registration is already active.
    #[error("the monitor is already enabled")]
    AlreadyRegistered,

    /// The callback context or the hook registration could not be allocated.
    #[error("insufficient resources to register the hook")]
    InsufficientResources,

    /// The request carried buffers the operation does not accept.
    #[error("invalid parameter")]
    InvalidParameter,

    /// The query reply buffer is not exactly one byte.
    #[error("invalid buffer size")]
    InvalidBufferSize,

    /// The control code is not recognised.
    #[error("unsuccessful")]
    Unsuccessful,

    /// The hook facility rejected the request.
    #[error("hook facility error: {0}")]
    Facility(String),
}

impl MonitorError {
    /// Returns the NTSTATUS value a request failing with this error completes with.
    pub fn status(&self) -> u32 {
        match self {
            MonitorError::AlreadyRegistered => STATUS_ALREADY_REGISTERED,
            MonitorError::InsufficientResources => STATUS_INSUFFICIENT_RESOURCES,
            MonitorError::InvalidParameter => STATUS_INVALID_PARAMETER,
            MonitorError::InvalidBufferSize => STATUS_INVALID_BUFFER_SIZE,
            MonitorError::Unsuccessful | MonitorError::Facility(_) => STATUS_UNSUCCESSFUL,
        }
    }
}

impl From<ProtocolError> for MonitorError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidBufferSize { .. } => MonitorError::InvalidBufferSize,
        }
    }
}
