//! Reply codec for the control protocol.
//!
//! Only `IOCTL_QUERY_MOUHID_INPUT_MONITOR` carries a payload:
//!
//! ```text
//! [enabled:1]
//! ```
//!
//! The byte is a Win32 `BOOLEAN`: zero is `false`, anything else is `true`.

use thiserror::Error;

/// Errors that can occur while encoding or decoding a reply buffer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The supplied buffer is not exactly the size of the reply.
    #[error("invalid buffer size: expected {expected} bytes, got {actual}")]
    InvalidBufferSize { expected: usize, actual: usize },
}

/// Reply to a query request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryMonitorReply {
    /// `true` while the interception hook is registered.
    pub enabled: bool,
}

impl QueryMonitorReply {
    /// Encoded size in bytes.
    pub const SIZE: usize = 1;

    /// Writes the reply into `buf` and returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidBufferSize`] unless `buf` is exactly
    /// [`Self::SIZE`] bytes long.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        check_size(buf.len())?;
        buf[0] = u8::from(self.enabled);
        Ok(Self::SIZE)
    }

    /// Reads a reply from `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidBufferSize`] unless `buf` is exactly
    /// [`Self::SIZE`] bytes long.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        check_size(buf.len())?;
        Ok(Self {
            enabled: buf[0] != 0,
        })
    }
}

fn check_size(actual: usize) -> Result<(), ProtocolError> {
    if actual != QueryMonitorReply::SIZE {
        return Err(ProtocolError::InvalidBufferSize {
            expected: QueryMonitorReply::SIZE,
            actual,
        });
    }
    Ok(())
}
