//! In-process hook facility.
//!
//! Stands in for the kernel hook manager so the engine can be driven end to
//! end without a class driver: tests (and the client's simulation mode)
//! deliver packet batches and PnP events through it and observe what reaches
//! the downstream [`RecordingClassService`].
//!
//! Delivery holds the facility's read lock for the duration of the hook
//! callback; `unregister` and device events take the write lock, so once they
//! return no batch is still running on the old registration. Device
//! notifications are invoked only after the write lock is released.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use mouhid_core::MouseInputPacket;

use super::{
    ClassDeviceId, ClassService, DeviceEvent, HookCallbacks, HookError, HookFacility,
    RegistrationHandle,
};
use crate::application::intercept::CallbackContext;

/// A downstream class service that records everything forwarded to it.
#[derive(Debug)]
pub struct RecordingClassService {
    device: ClassDeviceId,
    consume_limit: Option<usize>,
    batches: Mutex<Vec<Vec<MouseInputPacket>>>,
}

impl RecordingClassService {
    /// Creates a service that consumes every packet it is given.
    pub fn new(device: ClassDeviceId) -> Self {
        Self {
            device,
            consume_limit: None,
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Creates a service that consumes at most `limit` packets per batch.
    pub fn with_consume_limit(device: ClassDeviceId, limit: usize) -> Self {
        Self {
            consume_limit: Some(limit),
            ..Self::new(device)
        }
    }

    /// All forwarded packets, flattened in delivery order.
    pub fn forwarded(&self) -> Vec<MouseInputPacket> {
        self.lock().iter().flatten().copied().collect()
    }

    /// Size of each forwarded batch in delivery order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.lock().iter().map(Vec::len).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Vec<MouseInputPacket>>> {
        self.batches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ClassService for RecordingClassService {
    fn class_device(&self) -> ClassDeviceId {
        self.device
    }

    fn service(&self, packets: &[MouseInputPacket]) -> usize {
        self.lock().push(packets.to_vec());
        match self.consume_limit {
            Some(limit) => packets.len().min(limit),
            None => packets.len(),
        }
    }
}

struct ActiveHook {
    handle: RegistrationHandle,
    callbacks: Arc<dyn HookCallbacks>,
    context: Arc<CallbackContext>,
}

/// A mock implementation of [`HookFacility`] with a single hook slot.
pub struct MockHookFacility {
    class_service: Arc<dyn ClassService>,
    hook: RwLock<Option<ActiveHook>>,
    next_handle: AtomicU64,
    register_failure: Mutex<Option<HookError>>,
    unregister_failure: Mutex<Option<HookError>>,
    register_calls: AtomicUsize,
    unregister_calls: AtomicUsize,
}

impl MockHookFacility {
    /// Creates a facility whose unhooked (and forwarded) traffic goes to
    /// `class_service`.
    pub fn new(class_service: Arc<dyn ClassService>) -> Self {
        Self {
            class_service,
            hook: RwLock::new(None),
            next_handle: AtomicU64::new(1),
            register_failure: Mutex::new(None),
            unregister_failure: Mutex::new(None),
            register_calls: AtomicUsize::new(0),
            unregister_calls: AtomicUsize::new(0),
        }
    }

    /// Makes the next `register` call fail with `err`.
    pub fn fail_next_register(&self, err: HookError) {
        *lock(&self.register_failure) = Some(err);
    }

    /// Makes the next `unregister` call fail with `err` without removing the hook.
    pub fn fail_next_unregister(&self, err: HookError) {
        *lock(&self.unregister_failure) = Some(err);
    }

    /// Delivers one batch as the class driver would.
    ///
    /// With a hook installed the batch goes through the hook callback, which
    /// is expected to forward it; otherwise it goes straight downstream.
    /// Returns the consumed count.
    pub fn deliver_batch(&self, packets: &[MouseInputPacket]) -> usize {
        let hook = self.read_hook();
        match hook.as_ref() {
            Some(active) => {
                active
                    .callbacks
                    .on_packet_batch(&active.context, self.class_service.as_ref(), packets)
            }
            None => self.class_service.service(packets),
        }
    }

    /// Simulates a PnP change.
    ///
    /// The active registration (if any) is torn down first; its callbacks are
    /// then notified outside the facility lock. Returns the handle that was
    /// notified.
    pub fn device_event(&self, event: DeviceEvent) -> Option<RegistrationHandle> {
        let removed = self.write_hook().take();
        let active = removed?;
        active
            .callbacks
            .on_device_event(active.handle, event, &active.context);
        Some(active.handle)
    }

    /// Invokes the active hook's notification callback with an arbitrary
    /// `handle`, leaving the registration in place.
    ///
    /// Models a late notification for a registration that has already been
    /// superseded. Returns `false` if no hook is installed.
    pub fn inject_notification(&self, handle: RegistrationHandle, event: DeviceEvent) -> bool {
        let (callbacks, context) = match self.read_hook().as_ref() {
            Some(active) => (Arc::clone(&active.callbacks), Arc::clone(&active.context)),
            None => return false,
        };
        callbacks.on_device_event(handle, event, &context);
        true
    }

    /// Handle of the installed hook, if any.
    pub fn active_handle(&self) -> Option<RegistrationHandle> {
        self.read_hook().as_ref().map(|active| active.handle)
    }

    /// Context on loan to the installed hook, if any.
    pub fn active_context(&self) -> Option<Arc<CallbackContext>> {
        self.read_hook()
            .as_ref()
            .map(|active| Arc::clone(&active.context))
    }

    pub fn is_hooked(&self) -> bool {
        self.read_hook().is_some()
    }

    /// Number of `register` calls, successful or not.
    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    /// Number of `unregister` calls, successful or not.
    pub fn unregister_calls(&self) -> usize {
        self.unregister_calls.load(Ordering::SeqCst)
    }

    fn read_hook(&self) -> RwLockReadGuard<'_, Option<ActiveHook>> {
        self.hook.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_hook(&self) -> RwLockWriteGuard<'_, Option<ActiveHook>> {
        self.hook.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn mint_handle(&self) -> RegistrationHandle {
        let raw = self.next_handle.fetch_add(1, Ordering::Relaxed);
        // Starts at 1 and never wraps within a process lifetime.
        let raw = NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN);
        RegistrationHandle::from_raw(raw)
    }
}

impl HookFacility for MockHookFacility {
    fn register(
        &self,
        callbacks: Arc<dyn HookCallbacks>,
        context: Arc<CallbackContext>,
    ) -> Result<RegistrationHandle, HookError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.register_failure).take() {
            return Err(err);
        }

        let mut hook = self.write_hook();
        if hook.is_some() {
            return Err(HookError::Other("a hook is already installed".to_string()));
        }
        let handle = self.mint_handle();
        *hook = Some(ActiveHook {
            handle,
            callbacks,
            context,
        });
        Ok(handle)
    }

    fn unregister(&self, handle: RegistrationHandle) -> Result<(), HookError> {
        self.unregister_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.unregister_failure).take() {
            return Err(err);
        }

        let mut hook = self.write_hook();
        match hook.as_ref() {
            Some(active) if active.handle == handle => {
                // Dropping the hook releases the facility's loan of the context.
                *hook = None;
                Ok(())
            }
            _ => Err(HookError::NotRegistered(handle)),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Callbacks that forward and count notifications.
    #[derive(Default)]
    struct CountingCallbacks {
        notifications: Mutex<Vec<(RegistrationHandle, DeviceEvent)>>,
    }

    impl HookCallbacks for CountingCallbacks {
        fn on_packet_batch(
            &self,
            context: &CallbackContext,
            original: &dyn ClassService,
            packets: &[MouseInputPacket],
        ) -> usize {
            for _ in packets {
                context.next_packet_index();
            }
            original.service(packets)
        }

        fn on_device_event(
            &self,
            handle: RegistrationHandle,
            event: DeviceEvent,
            _context: &CallbackContext,
        ) {
            self.notifications.lock().unwrap().push((handle, event));
        }
    }

    fn facility() -> (MockHookFacility, Arc<RecordingClassService>) {
        let service = Arc::new(RecordingClassService::new(ClassDeviceId(1)));
        (MockHookFacility::new(service.clone()), service)
    }

    #[test]
    fn test_unhooked_batches_go_straight_downstream() {
        // Arrange
        let (facility, service) = facility();
        let batch = [MouseInputPacket::relative_move(0, 1, 2)];

        // Act
        let consumed = facility.deliver_batch(&batch);

        // Assert
        assert_eq!(consumed, 1);
        assert_eq!(service.forwarded(), batch.to_vec());
    }

    #[test]
    fn test_register_routes_batches_through_callbacks() {
        // Arrange
        let (facility, service) = facility();
        let context = Arc::new(CallbackContext::new());
        facility
            .register(Arc::new(CountingCallbacks::default()), context.clone())
            .expect("register should succeed");

        // Act
        facility.deliver_batch(&[MouseInputPacket::default(); 3]);

        // Assert
        assert_eq!(context.last_packet_index(), 3);
        assert_eq!(service.forwarded().len(), 3);
    }

    #[test]
    fn test_register_mints_distinct_handles() {
        let (facility, _) = facility();
        let callbacks: Arc<dyn HookCallbacks> = Arc::new(CountingCallbacks::default());

        let first = facility
            .register(callbacks.clone(), Arc::new(CallbackContext::new()))
            .unwrap();
        facility.unregister(first).unwrap();
        let second = facility
            .register(callbacks, Arc::new(CallbackContext::new()))
            .unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_unregister_drops_context_loan() {
        // Arrange
        let (facility, _) = facility();
        let context = Arc::new(CallbackContext::new());
        let handle = facility
            .register(Arc::new(CountingCallbacks::default()), context.clone())
            .unwrap();
        assert_eq!(Arc::strong_count(&context), 2);

        // Act
        facility.unregister(handle).expect("unregister should succeed");

        // Assert
        assert_eq!(Arc::strong_count(&context), 1);
        assert!(!facility.is_hooked());
    }

    #[test]
    fn test_unregister_unknown_handle_is_not_registered() {
        let (facility, _) = facility();
        let handle = RegistrationHandle::from_raw(NonZeroU64::new(99).unwrap());

        assert_eq!(
            facility.unregister(handle),
            Err(HookError::NotRegistered(handle))
        );
    }

    #[test]
    fn test_device_event_removes_hook_before_notifying() {
        // Arrange
        let (facility, _) = facility();
        let callbacks = Arc::new(CountingCallbacks::default());
        let handle = facility
            .register(callbacks.clone(), Arc::new(CallbackContext::new()))
            .unwrap();

        // Act
        let notified = facility.device_event(DeviceEvent::Removal);

        // Assert
        assert_eq!(notified, Some(handle));
        assert!(!facility.is_hooked());
        assert_eq!(
            *callbacks.notifications.lock().unwrap(),
            vec![(handle, DeviceEvent::Removal)]
        );
    }

    #[test]
    fn test_device_event_without_hook_notifies_nobody() {
        let (facility, _) = facility();
        assert_eq!(facility.device_event(DeviceEvent::Arrival), None);
    }

    #[test]
    fn test_injected_failures_apply_once() {
        let (facility, _) = facility();
        facility.fail_next_register(HookError::InsufficientResources);

        let callbacks: Arc<dyn HookCallbacks> = Arc::new(CountingCallbacks::default());
        let first = facility.register(callbacks.clone(), Arc::new(CallbackContext::new()));
        let second = facility.register(callbacks, Arc::new(CallbackContext::new()));

        assert_eq!(first, Err(HookError::InsufficientResources));
        assert!(second.is_ok());
        assert_eq!(facility.register_calls(), 2);
    }
}
