//! Registration state machine for the MouHid Monitor.
//!
//! The [`Monitor`] owns at most one registration: the facility handle plus
//! the [`CallbackContext`] on loan to the hot path. Three paths can end a
//! registration and each of them takes the exclusive lock:
//!
//! ```text
//!            enable()
//! Disabled ───────────► Enabled
//!    ▲                     │ disable()            (unregister, then release)
//!    └─────────────────────┤ device notification  (facility already unhooked)
//!                          │ gateway close / unload → disable()
//! ```
//!
//! Whichever path takes the lock first performs the release; the others see
//! `Disabled` and become a no-op (`disable`) or a stale handle mismatch
//! (notification). A `disable` that wins the lock after the facility already
//! unhooked gets `NotRegistered` back, reports it and keeps the registration;
//! the queued notification then performs the release.
//!
//! `enable` keeps the exclusive lock across `register` and the store of the
//! returned handle, so a notification raised right after registration waits
//! until the handle is observable and then matches it.

use std::ptr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use mouhid_core::{MonitorError, MouseInputPacket};
use tracing::{debug, error, warn};

use crate::application::intercept::{CallbackContext, PacketInterceptor};
use crate::infrastructure::hook_facility::{
    ClassService, DeviceEvent, HookCallbacks, HookError, HookFacility, RegistrationHandle,
};
use crate::infrastructure::packet_log::PacketLogger;

const MODULE_TITLE: &str = "MouHid Monitor";

/// Tunables for the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Panic when a device notification names a registration that is not the
    /// current one. Defaults to `true` in debug builds.
    pub trap_on_stale_notification: bool,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            trap_on_stale_notification: cfg!(debug_assertions),
        }
    }
}

impl From<HookError> for MonitorError {
    fn from(err: HookError) -> Self {
        match err {
            HookError::InsufficientResources => MonitorError::InsufficientResources,
            other => MonitorError::Facility(other.to_string()),
        }
    }
}

/// One installed hook: the facility's handle and the context it borrows.
struct Registration {
    handle: RegistrationHandle,
    context: Arc<CallbackContext>,
}

impl Registration {
    fn release(self) {
        self.context.retire();
    }
}

#[derive(Default)]
struct MonitorState {
    registration: Option<Registration>,
}

struct MonitorShared {
    facility: Arc<dyn HookFacility>,
    hooks: Arc<dyn HookCallbacks>,
    options: MonitorOptions,
    state: RwLock<MonitorState>,
}

impl MonitorShared {
    fn read_state(&self) -> RwLockReadGuard<'_, MonitorState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, MonitorState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle_notification(
        &self,
        handle: RegistrationHandle,
        event: DeviceEvent,
        context: &CallbackContext,
    ) {
        match event {
            DeviceEvent::Arrival => debug!(%handle, "Received hook notification. (Arrival)"),
            DeviceEvent::Removal => debug!(%handle, "Received hook notification. (Removal)"),
        }

        let mut state = self.write_state();

        let current = state.registration.as_ref().map(|r| r.handle);
        if current != Some(handle) {
            error!(
                %handle,
                current = ?current.map(RegistrationHandle::as_raw),
                "Unexpected registration handle in device notification."
            );
            if self.options.trap_on_stale_notification {
                drop(state);
                panic!("stale device notification for registration {handle}");
            }
            return;
        }

        // The facility removed the hook before notifying: only the release is left.
        if let Some(registration) = state.registration.take() {
            debug_assert!(
                ptr::eq(context, Arc::as_ptr(&registration.context)),
                "notification context does not belong to the current registration"
            );
            registration.release();
        }

        debug!("{MODULE_TITLE} disabled.");
    }
}

/// The callbacks handed to the facility; implemented once per monitor.
struct MonitorHooks {
    monitor: Weak<MonitorShared>,
    interceptor: PacketInterceptor,
}

impl HookCallbacks for MonitorHooks {
    fn on_packet_batch(
        &self,
        context: &CallbackContext,
        original: &dyn ClassService,
        packets: &[MouseInputPacket],
    ) -> usize {
        self.interceptor.intercept(context, original, packets)
    }

    fn on_device_event(
        &self,
        handle: RegistrationHandle,
        event: DeviceEvent,
        context: &CallbackContext,
    ) {
        match self.monitor.upgrade() {
            Some(monitor) => monitor.handle_notification(handle, event, context),
            None => error!(%handle, ?event, "Device notification after {MODULE_TITLE} unload."),
        }
    }
}

/// The MouHid Monitor service.
///
/// Created once at load with [`Monitor::load`] and torn down with
/// [`Monitor::unload`] (or by dropping it), which disables any remaining
/// registration.
pub struct Monitor {
    shared: Arc<MonitorShared>,
}

impl Monitor {
    /// Initialises the monitor in the `Disabled` state.
    pub fn load(
        facility: Arc<dyn HookFacility>,
        logger: Arc<dyn PacketLogger>,
        options: MonitorOptions,
    ) -> Self {
        debug!("Loading {MODULE_TITLE}.");

        let shared = Arc::new_cyclic(|weak: &Weak<MonitorShared>| {
            let hooks: Arc<dyn HookCallbacks> = Arc::new(MonitorHooks {
                monitor: weak.clone(),
                interceptor: PacketInterceptor::new(logger),
            });
            MonitorShared {
                facility,
                hooks,
                options,
                state: RwLock::new(MonitorState::default()),
            }
        });

        debug!("{MODULE_TITLE} loaded.");
        Self { shared }
    }

    /// Returns `true` while a registration is held.
    pub fn query(&self) -> bool {
        self.shared.read_state().registration.is_some()
    }

    /// Registers the interception hook.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::AlreadyRegistered`] if the monitor is already enabled.
    /// - [`MonitorError::InsufficientResources`] or [`MonitorError::Facility`]
    ///   if the facility rejects the registration. The monitor stays disabled.
    pub fn enable(&self) -> Result<(), MonitorError> {
        debug!("Enabling {MODULE_TITLE}.");

        let mut state = self.shared.write_state();

        if state.registration.is_some() {
            error!("{MODULE_TITLE} is already enabled.");
            return Err(MonitorError::AlreadyRegistered);
        }

        let context = Arc::new(CallbackContext::new());

        let handle = match self
            .shared
            .facility
            .register(Arc::clone(&self.shared.hooks), Arc::clone(&context))
        {
            Ok(handle) => handle,
            Err(err) => {
                error!("Hook registration failed: {err}");
                context.retire();
                return Err(err.into());
            }
        };

        state.registration = Some(Registration { handle, context });

        debug!(%handle, "{MODULE_TITLE} enabled.");
        Ok(())
    }

    /// Removes the interception hook.
    ///
    /// Disabling an already-disabled monitor logs a warning and succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Facility`] if the facility fails to unregister,
    /// `NotRegistered` included; the registration is then kept as-is.
    pub fn disable(&self) -> Result<(), MonitorError> {
        debug!("Disabling {MODULE_TITLE}.");

        let mut state = self.shared.write_state();

        let Some(handle) = state.registration.as_ref().map(|r| r.handle) else {
            warn!("{MODULE_TITLE} is not enabled.");
            return Ok(());
        };

        // Removal not confirmed: the context may still be on loan.
        if let Err(err) = self.shared.facility.unregister(handle) {
            error!(%handle, "Hook unregistration failed: {err}");
            return Err(err.into());
        }

        if let Some(registration) = state.registration.take() {
            registration.release();
        }

        debug!("{MODULE_TITLE} disabled.");
        Ok(())
    }

    /// Tears the monitor down, disabling any remaining registration.
    pub fn unload(self) {
        drop(self);
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        debug!("Unloading {MODULE_TITLE}.");

        let result = self.disable();
        if let Err(err) = &result {
            error!("Failed to disable {MODULE_TITLE} during unload: {err}");
        }
        debug_assert!(result.is_ok(), "{MODULE_TITLE} unload left a registration behind");

        debug!("{MODULE_TITLE} unloaded.");
    }
}
