//! Integration tests for the registration state machine.
//!
//! These tests drive `Monitor` + `ControlGateway` end-to-end through the
//! in-process hook facility, including the concurrent and hot-plug races.

use std::sync::{Arc, Barrier, Weak};
use std::thread;

use mouhid_core::protocol::{
    IOCTL_DISABLE_MOUHID_INPUT_MONITOR, IOCTL_ENABLE_MOUHID_INPUT_MONITOR,
    IOCTL_QUERY_MOUHID_INPUT_MONITOR,
};
use mouhid_core::{MonitorError, MouseInputPacket, QueryMonitorReply};
use mouhid_monitor::infrastructure::hook_facility::mock::{MockHookFacility, RecordingClassService};
use mouhid_monitor::infrastructure::hook_facility::{ClassDeviceId, DeviceEvent};
use mouhid_monitor::infrastructure::packet_log::RecordingPacketLogger;
use mouhid_monitor::{CallbackContext, ControlGateway, Monitor, MonitorOptions};

// ── Helpers ───────────────────────────────────────────────────────────────────

struct Harness {
    facility: Arc<MockHookFacility>,
    service: Arc<RecordingClassService>,
    logger: Arc<RecordingPacketLogger>,
    monitor: Arc<Monitor>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

fn harness_with(options: MonitorOptions) -> Harness {
    init_tracing();
    let service = Arc::new(RecordingClassService::new(ClassDeviceId(0xFFFF_8000_0000_1000)));
    let facility = Arc::new(MockHookFacility::new(service.clone()));
    let logger = Arc::new(RecordingPacketLogger::new());
    let monitor = Arc::new(Monitor::load(facility.clone(), logger.clone(), options));
    Harness {
        facility,
        service,
        logger,
        monitor,
    }
}

fn harness() -> Harness {
    harness_with(MonitorOptions {
        trap_on_stale_notification: false,
    })
}

/// Takes a weak reference to the context currently on loan to the facility.
fn loaned_context(facility: &MockHookFacility) -> Weak<CallbackContext> {
    let context = facility.active_context().expect("a hook must be installed");
    Arc::downgrade(&context)
}

fn wire_query(gateway: &ControlGateway) -> bool {
    let mut reply = [0u8; QueryMonitorReply::SIZE];
    gateway
        .dispatch(IOCTL_QUERY_MOUHID_INPUT_MONITOR, &[], &mut reply)
        .expect("query must succeed");
    QueryMonitorReply::decode(&reply).expect("reply must decode").enabled
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

#[test]
fn test_end_to_end_enable_query_disable_query() {
    let h = harness();

    h.monitor.enable().expect("enable must succeed");
    assert!(h.monitor.query());
    h.monitor.disable().expect("disable must succeed");
    assert!(!h.monitor.query());
}

#[test]
fn test_end_to_end_over_the_gateway_wire_protocol() {
    // Arrange
    let h = harness();
    let gateway = ControlGateway::new(Arc::clone(&h.monitor));
    gateway.on_create();

    // Act / Assert
    assert_eq!(
        gateway.dispatch(IOCTL_ENABLE_MOUHID_INPUT_MONITOR, &[], &mut []),
        Ok(0)
    );
    assert!(wire_query(&gateway));
    assert_eq!(
        gateway.dispatch(IOCTL_ENABLE_MOUHID_INPUT_MONITOR, &[], &mut []),
        Err(MonitorError::AlreadyRegistered)
    );
    assert!(wire_query(&gateway));
    assert_eq!(
        gateway.dispatch(IOCTL_DISABLE_MOUHID_INPUT_MONITOR, &[], &mut []),
        Ok(0)
    );
    assert!(!wire_query(&gateway));
    gateway.on_close();
}

#[test]
fn test_client_exit_without_disable_is_cleaned_up_on_close() {
    let h = harness();
    let gateway = ControlGateway::new(Arc::clone(&h.monitor));
    gateway
        .dispatch(IOCTL_ENABLE_MOUHID_INPUT_MONITOR, &[], &mut [])
        .unwrap();
    let context = loaned_context(&h.facility);

    gateway.on_close();

    assert!(!h.facility.is_hooked());
    assert!(context.upgrade().is_none(), "context must be freed after close");
}

#[test]
fn test_enable_when_enabled_keeps_registration() {
    let h = harness();
    h.monitor.enable().unwrap();
    let handle = h.facility.active_handle();

    assert_eq!(h.monitor.enable(), Err(MonitorError::AlreadyRegistered));
    assert!(h.monitor.query());
    assert_eq!(h.facility.active_handle(), handle);
}

#[test]
fn test_disable_releases_context_exactly_once() {
    // Arrange
    let h = harness();
    h.monitor.enable().unwrap();
    let context = loaned_context(&h.facility);

    // Act
    h.monitor.disable().unwrap();

    // Assert – nobody holds the context any more
    assert!(context.upgrade().is_none());
    // A second disable is a warning-level no-op
    assert_eq!(h.monitor.disable(), Ok(()));
    assert_eq!(h.facility.unregister_calls(), 1);
}

#[test]
fn test_unload_with_active_registration_unhooks() {
    init_tracing();
    let service = Arc::new(RecordingClassService::new(ClassDeviceId(1)));
    let facility = Arc::new(MockHookFacility::new(service));
    let monitor = Monitor::load(
        facility.clone(),
        Arc::new(RecordingPacketLogger::new()),
        MonitorOptions::default(),
    );
    monitor.enable().unwrap();
    let context = loaned_context(&facility);

    monitor.unload();

    assert!(!facility.is_hooked());
    assert!(context.upgrade().is_none());
}

// ── Hot path ──────────────────────────────────────────────────────────────────

#[test]
fn test_batches_are_tagged_gap_free_and_forwarded_unchanged() {
    // Arrange
    let h = harness();
    h.monitor.enable().unwrap();
    let input: Vec<MouseInputPacket> = (0..11)
        .map(|i| MouseInputPacket::relative_move(1, i, -i))
        .collect();

    // Act – batches of [3, 1, 7]
    let consumed: Vec<usize> = [&input[0..3], &input[3..4], &input[4..11]]
        .into_iter()
        .map(|batch| h.facility.deliver_batch(batch))
        .collect();

    // Assert
    assert_eq!(consumed, vec![3, 1, 7]);
    assert_eq!(h.logger.indices(), (1..=11).collect::<Vec<u64>>());
    assert_eq!(h.logger.packets(), input);
    assert_eq!(h.service.forwarded(), input);
    assert_eq!(h.service.batch_sizes(), vec![3, 1, 7]);
}

#[test]
fn test_concurrent_batches_never_repeat_or_skip_an_index() {
    // Arrange
    let h = harness();
    h.monitor.enable().unwrap();
    let threads = 4;
    let batches_per_thread = 250;
    let barrier = Arc::new(Barrier::new(threads));

    // Act
    let workers: Vec<_> = (0..threads)
        .map(|_| {
            let facility = Arc::clone(&h.facility);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..batches_per_thread {
                    facility.deliver_batch(&[MouseInputPacket::default(); 2]);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("delivery thread panicked");
    }

    // Assert – every index from 1..=N appears exactly once
    let total = (threads * batches_per_thread * 2) as u64;
    let mut indices = h.logger.indices();
    indices.sort_unstable();
    assert_eq!(indices, (1..=total).collect::<Vec<u64>>());
    assert_eq!(h.service.forwarded().len() as u64, total);
}

// ── Concurrency and races ─────────────────────────────────────────────────────

#[test]
fn test_concurrent_control_calls_never_tear_state() {
    // Arrange
    let h = harness();
    let threads = 8;
    let rounds = 200;
    let barrier = Arc::new(Barrier::new(threads + 1));

    // Act – togglers race each other while a delivery thread keeps traffic flowing
    let mut workers: Vec<_> = (0..threads)
        .map(|i| {
            let monitor = Arc::clone(&h.monitor);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for round in 0..rounds {
                    match (i + round) % 3 {
                        0 => match monitor.enable() {
                            Ok(()) | Err(MonitorError::AlreadyRegistered) => {}
                            Err(other) => panic!("unexpected enable error: {other}"),
                        },
                        1 => {
                            let _ = monitor.query();
                        }
                        _ => monitor.disable().expect("disable must not fail"),
                    }
                }
            })
        })
        .collect();
    {
        let facility = Arc::clone(&h.facility);
        let barrier = Arc::clone(&barrier);
        workers.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..500 {
                facility.deliver_batch(&[MouseInputPacket::default()]);
            }
        }));
    }
    for worker in workers {
        worker.join().expect("worker panicked");
    }

    // Assert – the monitor's view and the facility's view agree
    assert_eq!(h.monitor.query(), h.facility.is_hooked());
    assert_eq!(h.service.forwarded().len(), 500);

    // Within each registration the logged indices restart at 1 and run without gaps.
    let indices = h.logger.indices();
    if let Some(&first) = indices.first() {
        assert_eq!(first, 1);
    }
    for pair in indices.windows(2) {
        assert!(
            pair[1] == pair[0] + 1 || pair[1] == 1,
            "index jumped from {} to {}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn test_disable_racing_removal_releases_exactly_once() {
    for _ in 0..100 {
        // Arrange
        let h = harness();
        h.monitor.enable().unwrap();
        let context = loaned_context(&h.facility);
        let barrier = Arc::new(Barrier::new(2));

        // Act
        let disabler = {
            let monitor = Arc::clone(&h.monitor);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                monitor.disable()
            })
        };
        let remover = {
            let facility = Arc::clone(&h.facility);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                facility.device_event(DeviceEvent::Removal)
            })
        };
        let disabled = disabler.join().expect("disable thread panicked");
        remover.join().expect("notification thread panicked");

        // Assert – one path released; a double release would have panicked.
        // A disable that found the hook already gone reports it instead of succeeding.
        match disabled {
            Ok(()) => {}
            Err(MonitorError::Facility(reason)) => assert!(reason.contains("is not active")),
            Err(other) => panic!("unexpected disable error: {other:?}"),
        }
        assert!(!h.monitor.query());
        assert!(!h.facility.is_hooked());
        assert!(context.upgrade().is_none());
    }
}

#[test]
fn test_removal_notification_then_reenable_starts_fresh_registration() {
    // Arrange
    let h = harness();
    h.monitor.enable().unwrap();
    h.facility.deliver_batch(&[MouseInputPacket::default(); 2]);
    let first = h.facility.active_handle().unwrap();

    // Act – hot-plug disables, the client re-enables on its next poll
    let notified = h.facility.device_event(DeviceEvent::Removal);
    assert_eq!(notified, Some(first));
    assert!(!h.monitor.query());
    h.monitor.enable().unwrap();
    h.facility.deliver_batch(&[MouseInputPacket::default()]);

    // Assert
    assert_ne!(h.facility.active_handle(), Some(first));
    assert_eq!(h.logger.indices(), vec![1, 2, 1]);
}

#[test]
fn test_stale_notification_is_ignored() {
    // Arrange – disable then enable so the first handle is superseded
    let h = harness();
    h.monitor.enable().unwrap();
    let old_handle = h.facility.active_handle().unwrap();
    h.monitor.disable().unwrap();
    h.monitor.enable().unwrap();
    let current = h.facility.active_handle();
    let context = loaned_context(&h.facility);

    // Act
    assert!(h.facility.inject_notification(old_handle, DeviceEvent::Removal));

    // Assert
    assert!(h.monitor.query());
    assert_eq!(h.facility.active_handle(), current);
    let context = context.upgrade().expect("current context must survive");
    assert!(!context.is_retired());
}

#[test]
#[should_panic(expected = "stale device notification")]
fn test_stale_notification_traps_when_enabled() {
    let h = harness_with(MonitorOptions {
        trap_on_stale_notification: true,
    });
    h.monitor.enable().unwrap();
    let old_handle = h.facility.active_handle().unwrap();
    h.monitor.disable().unwrap();
    h.monitor.enable().unwrap();

    h.facility.inject_notification(old_handle, DeviceEvent::Arrival);
}

#[test]
fn test_register_failure_leaves_monitor_disabled() {
    use mouhid_monitor::infrastructure::hook_facility::HookError;

    let h = harness();
    h.facility.fail_next_register(HookError::InsufficientResources);

    assert_eq!(h.monitor.enable(), Err(MonitorError::InsufficientResources));
    assert!(!h.monitor.query());

    // The next attempt goes through.
    h.monitor.enable().expect("retry must succeed");
    assert!(h.monitor.query());
}
