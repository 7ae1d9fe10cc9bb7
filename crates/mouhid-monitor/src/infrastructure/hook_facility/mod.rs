//! Contract with the hook facility that splices callbacks into the mouse
//! class service path.
//!
//! The facility owns the live splice and the PnP notification channel. The
//! engine hands it a callbacks object and a callback context on
//! [`HookFacility::register`] and gets back an opaque [`RegistrationHandle`].
//!
//! # Guarantees the engine relies on
//!
//! - After `register` returns `Ok`, [`HookCallbacks::on_packet_batch`] runs for
//!   every packet batch instead of the original class service callback, which
//!   is passed along so the batch can be forwarded.
//! - After `unregister` returns `Ok`, no further `on_packet_batch` runs for
//!   that registration.
//! - On device arrival or removal the facility tears the registration down
//!   itself and only then calls [`HookCallbacks::on_device_event`]. The
//!   callee must not call `unregister` for that handle again.
//! - `on_device_event` is never invoked synchronously from inside `register`
//!   or `unregister`: the caller may be holding a non-reentrant lock around
//!   both.
//! - The facility only borrows the context. It drops its clone once the
//!   registration is gone.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::Arc;

use mouhid_core::MouseInputPacket;
use thiserror::Error;

use crate::application::intercept::CallbackContext;

pub mod mock;

/// Opaque token identifying one registration.
///
/// Only ever compared and passed back to the facility; it never points at
/// anything the engine can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationHandle(NonZeroU64);

impl RegistrationHandle {
    /// Wraps a raw facility token.
    pub const fn from_raw(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    /// Returns the raw facility token.
    pub const fn as_raw(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for RegistrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0.get())
    }
}

/// PnP change reported by the facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A mouse device arrived; the class service callback may have changed.
    Arrival,
    /// A mouse device was removed.
    Removal,
}

/// Identity of the class device object a batch is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassDeviceId(pub u64);

impl fmt::Display for ClassDeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// The original class service callback a hooked batch must be forwarded to.
pub trait ClassService: Send + Sync {
    /// Class device object the callback services.
    fn class_device(&self) -> ClassDeviceId;

    /// Delivers `packets` to the rest of the input stack and returns how many
    /// were consumed.
    fn service(&self, packets: &[MouseInputPacket]) -> usize;
}

/// Callbacks the engine hands to the facility.
pub trait HookCallbacks: Send + Sync {
    /// Called once per contiguous packet batch, on the delivery context.
    ///
    /// Must not block or allocate. Returns the consumed count reported by
    /// `original`.
    fn on_packet_batch(
        &self,
        context: &CallbackContext,
        original: &dyn ClassService,
        packets: &[MouseInputPacket],
    ) -> usize;

    /// Called after the facility has already removed the registration
    /// identified by `handle`.
    fn on_device_event(
        &self,
        handle: RegistrationHandle,
        event: DeviceEvent,
        context: &CallbackContext,
    );
}

/// Error type for facility operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HookError {
    /// The facility could not allocate the splice.
    #[error("insufficient resources to install the hook")]
    InsufficientResources,
    /// The handle does not name a live registration.
    #[error("registration {0} is not active")]
    NotRegistered(RegistrationHandle),
    /// No mouse class service callback is available to hook.
    #[error("no mouse class service callback to hook")]
    NoClassService,
    /// Any other facility failure.
    #[error("{0}")]
    Other(String),
}

/// The facility that splices [`HookCallbacks`] into the packet delivery path.
pub trait HookFacility: Send + Sync {
    /// Installs `callbacks` with `context` on loan and returns the new handle.
    fn register(
        &self,
        callbacks: Arc<dyn HookCallbacks>,
        context: Arc<CallbackContext>,
    ) -> Result<RegistrationHandle, HookError>;

    /// Removes the registration identified by `handle`.
    fn unregister(&self, handle: RegistrationHandle) -> Result<(), HookError>;
}
