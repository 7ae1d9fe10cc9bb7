//! PollMonitorUseCase: keeps the monitor enabled across device changes.
//!
//! A mouse arrival or removal silently disables the monitor on the privileged
//! side. The client polls on a fixed interval and re-enables it whenever a
//! query reports `Disabled`. Failures are logged and retried on the next
//! tick; there is no backoff and no cancellation.
//!
//! The use case talks to the monitor through the [`MonitorDevice`] trait so
//! the same logic drives the Windows device handle, the in-process gateway,
//! and test mocks.

use std::sync::Arc;

use mouhid_core::{MonitorError, ProtocolError};
use thiserror::Error;
use tracing::{error, info, warn};

/// Error type for device requests.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The control device could not be opened.
    #[error("could not open {path}: {reason}")]
    Open { path: String, reason: String },

    /// The monitor completed the request with an error status.
    #[error("request rejected: {0}")]
    Rejected(#[from] MonitorError),

    /// The query reply did not have the expected layout.
    #[error("malformed reply: {0}")]
    MalformedReply(#[from] ProtocolError),

    /// The OS failed the request before it reached the monitor.
    #[error("OS error: {0}")]
    Os(String),
}

/// Control operations the client issues against the monitor.
pub trait MonitorDevice: Send + Sync {
    /// Returns `true` while the monitor holds a registration.
    fn query(&self) -> Result<bool, DeviceError>;

    /// Asks the monitor to install its hook.
    fn enable(&self) -> Result<(), DeviceError>;

    /// Asks the monitor to remove its hook.
    fn disable(&self) -> Result<(), DeviceError>;
}

/// Result of [`PollMonitorUseCase::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// This client enabled the monitor and now owns it.
    Enabled,
    /// Another client already enabled it; this one must not interfere.
    AlreadyEnabled,
}

/// Result of one [`PollMonitorUseCase::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The monitor is still enabled.
    StillEnabled,
    /// The monitor had been disabled by a device change and was re-enabled.
    Reenabled,
    /// The query failed; retried next tick.
    QueryFailed,
    /// Re-enabling failed; retried next tick.
    ReenableFailed,
}

/// The Poll Monitor use case.
pub struct PollMonitorUseCase {
    device: Arc<dyn MonitorDevice>,
    owns_monitor: bool,
}

impl PollMonitorUseCase {
    pub fn new(device: Arc<dyn MonitorDevice>) -> Self {
        Self {
            device,
            owns_monitor: false,
        }
    }

    /// Returns `true` once this client has enabled the monitor.
    pub fn owns_monitor(&self) -> bool {
        self.owns_monitor
    }

    /// Enables the monitor unless another client already did.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the initial query or enable fails. Unlike
    /// [`tick`](Self::tick), startup failures are not retried.
    pub fn start(&mut self) -> Result<StartOutcome, DeviceError> {
        if self.device.query()? {
            warn!("MouHid Monitor is already enabled.");
            return Ok(StartOutcome::AlreadyEnabled);
        }

        self.device.enable()?;
        self.owns_monitor = true;

        info!("MouHid Input Monitor enabled.");
        Ok(StartOutcome::Enabled)
    }

    /// Runs one poll: query, and re-enable if a device change disabled the
    /// monitor.
    pub fn tick(&mut self) -> PollOutcome {
        let enabled = match self.device.query() {
            Ok(enabled) => enabled,
            Err(e) => {
                error!("query monitor failed: {e}");
                return PollOutcome::QueryFailed;
            }
        };

        if enabled {
            return PollOutcome::StillEnabled;
        }

        info!("Detected mouse device changes. Enabling MouHid Monitor.");

        match self.device.enable() {
            Ok(()) => PollOutcome::Reenabled,
            Err(e) => {
                error!("enable monitor failed: {e}");
                PollOutcome::ReenableFailed
            }
        }
    }

    /// Disables the monitor if this client enabled it.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the disable request fails.
    pub fn stop(&mut self) -> Result<(), DeviceError> {
        if !self.owns_monitor {
            return Ok(());
        }
        self.owns_monitor = false;
        self.device.disable()
    }
}
