//! Control gateway: the request boundary in front of the [`Monitor`].
//!
//! Validates buffered control requests, maps them onto monitor operations,
//! and marshals the reply. A request that fails validation never reaches the
//! monitor.
//!
//! Closing a client handle runs [`Monitor::disable`] unconditionally, so a
//! client that exits without disabling never leaves the hook installed.

use std::sync::Arc;

use mouhid_core::{ControlCode, MonitorError, QueryMonitorReply};
use tracing::{debug, error};

use crate::application::monitor::Monitor;

/// Adapter between the buffered control protocol and the monitor.
#[derive(Clone)]
pub struct ControlGateway {
    monitor: Arc<Monitor>,
}

impl ControlGateway {
    pub fn new(monitor: Arc<Monitor>) -> Self {
        Self { monitor }
    }

    /// A client opened the device. Always succeeds.
    pub fn on_create(&self) {
        debug!("Control device opened.");
    }

    /// A client closed its handle: disable as a safety net.
    pub fn on_close(&self) {
        debug!("Control device closed.");

        let result = self.monitor.disable();
        if let Err(err) = &result {
            error!("Failed to disable monitor on close: {err}");
        }
        debug_assert!(result.is_ok(), "disable on close failed");
    }

    /// Handles one control request.
    ///
    /// `input` and `output` are the request's input and output buffers.
    /// Returns the number of bytes written to `output`.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::Unsuccessful`] for an unknown control code.
    /// - [`MonitorError::InvalidParameter`] if a buffer is supplied that the
    ///   operation does not take.
    /// - [`MonitorError::InvalidBufferSize`] if the query output is not
    ///   exactly one byte.
    /// - Whatever the monitor operation itself reports.
    pub fn dispatch(&self, code: u32, input: &[u8], output: &mut [u8]) -> Result<usize, MonitorError> {
        let Some(control) = ControlCode::from_code(code) else {
            error!("Unhandled control code: 0x{code:08X}");
            return Err(MonitorError::Unsuccessful);
        };

        debug!(%control, input_len = input.len(), output_len = output.len(), "Control request.");

        let result = self.handle(control, input, output);
        if let Err(err) = &result {
            error!("{control} failed: 0x{:08X} ({err})", err.status());
        }
        result
    }

    fn handle(
        &self,
        control: ControlCode,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, MonitorError> {
        match control {
            ControlCode::QueryMonitor => {
                if !input.is_empty() {
                    return Err(MonitorError::InvalidParameter);
                }
                let reply = QueryMonitorReply {
                    enabled: self.monitor.query(),
                };
                Ok(reply.encode_into(output)?)
            }
            ControlCode::EnableMonitor => {
                reject_buffers(input, output)?;
                self.monitor.enable()?;
                Ok(0)
            }
            ControlCode::DisableMonitor => {
                reject_buffers(input, output)?;
                self.monitor.disable()?;
                Ok(0)
            }
        }
    }
}

fn reject_buffers(input: &[u8], output: &[u8]) -> Result<(), MonitorError> {
    if input.is_empty() && output.is_empty() {
        Ok(())
    } else {
        Err(MonitorError::InvalidParameter)
    }
}
