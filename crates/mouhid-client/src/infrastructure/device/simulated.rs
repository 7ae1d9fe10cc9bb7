//! Simulated mouse hardware for hosting the engine in-process.
//!
//! [`SimulatedSystem::build`] wires a [`Monitor`] to a [`MockHookFacility`]
//! whose downstream class service just counts packets, and opens a
//! [`LocalDevice`] on its gateway. [`spawn_hardware`] then plays the part of
//! the mouse class driver: it delivers small packet batches on a fixed
//! interval and periodically unplugs and replugs the device, which disables
//! the monitor the same way a real PnP change does.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mouhid_core::packet::buttons;
use mouhid_core::MouseInputPacket;
use mouhid_monitor::infrastructure::hook_facility::mock::MockHookFacility;
use mouhid_monitor::infrastructure::hook_facility::{ClassDeviceId, ClassService, DeviceEvent};
use mouhid_monitor::infrastructure::packet_log::PacketLogger;
use mouhid_monitor::{ControlGateway, Monitor, MonitorOptions};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::local::LocalDevice;

/// Identity reported for the synthetic class device.
pub const SIMULATED_CLASS_DEVICE: ClassDeviceId = ClassDeviceId(0xFFFF_A000_0000_1000);

/// Downstream end of the synthetic input stack.
#[derive(Debug, Default)]
pub struct CountingClassService {
    delivered: AtomicU64,
}

impl CountingClassService {
    /// Packets consumed so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

impl ClassService for CountingClassService {
    fn class_device(&self) -> ClassDeviceId {
        SIMULATED_CLASS_DEVICE
    }

    fn service(&self, packets: &[MouseInputPacket]) -> usize {
        self.delivered
            .fetch_add(packets.len() as u64, Ordering::Relaxed);
        packets.len()
    }
}

/// Timing of the synthetic hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareProfile {
    pub batch_interval: Duration,
    pub max_batch_size: usize,
    /// `None` disables hot-plug events.
    pub hotplug_interval: Option<Duration>,
}

/// The engine hosted in-process, plus an open device on its gateway.
pub struct SimulatedSystem {
    pub facility: Arc<MockHookFacility>,
    pub class_service: Arc<CountingClassService>,
    pub device: Arc<LocalDevice>,
}

impl SimulatedSystem {
    /// Loads a monitor on a fresh mock facility and opens the control device.
    pub fn build(logger: Arc<dyn PacketLogger>, options: MonitorOptions) -> Self {
        let class_service = Arc::new(CountingClassService::default());
        let facility = Arc::new(MockHookFacility::new(class_service.clone()));
        let monitor = Monitor::load(facility.clone(), logger, options);
        let device = Arc::new(LocalDevice::open(ControlGateway::new(Arc::new(monitor))));

        Self {
            facility,
            class_service,
            device,
        }
    }
}

/// Deterministic packet generator: a slow circle with an occasional click.
#[derive(Debug, Default)]
pub struct PacketGenerator {
    step: u64,
}

impl PacketGenerator {
    const CIRCLE: [(i32, i32); 8] = [
        (4, 0),
        (3, 3),
        (0, 4),
        (-3, 3),
        (-4, 0),
        (-3, -3),
        (0, -4),
        (3, -3),
    ];

    /// Produces the next batch of between 1 and `max_batch_size` packets.
    pub fn next_batch(&mut self, max_batch_size: usize) -> Vec<MouseInputPacket> {
        let size = (self.step as usize % max_batch_size.max(1)) + 1;
        (0..size).map(|_| self.next_packet()).collect()
    }

    fn next_packet(&mut self) -> MouseInputPacket {
        let step = self.step;
        self.step += 1;

        match step % 64 {
            0 => MouseInputPacket::button(0, buttons::LEFT_DOWN),
            1 => MouseInputPacket::button(0, buttons::LEFT_UP),
            n => {
                let (dx, dy) = Self::CIRCLE[(n % 8) as usize];
                MouseInputPacket::relative_move(0, dx, dy)
            }
        }
    }
}

/// Spawns the synthetic class driver; it runs until `running` is cleared.
pub fn spawn_hardware(
    facility: Arc<MockHookFacility>,
    profile: HardwareProfile,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            batch_interval_ms = profile.batch_interval.as_millis() as u64,
            max_batch_size = profile.max_batch_size,
            "simulated mouse hardware started"
        );

        let mut generator = PacketGenerator::default();
        let mut batches = tokio::time::interval(profile.batch_interval);
        // Only polled when hot-plug is configured.
        let hotplug_period = profile.hotplug_interval.unwrap_or(Duration::from_secs(3600));
        let mut hotplug =
            tokio::time::interval_at(tokio::time::Instant::now() + hotplug_period, hotplug_period);
        let mut next_event = DeviceEvent::Removal;

        while running.load(Ordering::Relaxed) {
            tokio::select! {
                _ = batches.tick() => {
                    let batch = generator.next_batch(profile.max_batch_size);
                    facility.deliver_batch(&batch);
                }
                _ = hotplug.tick(), if profile.hotplug_interval.is_some() => {
                    match facility.device_event(next_event) {
                        Some(handle) => info!(%handle, ?next_event, "simulated mouse device change"),
                        None => debug!(?next_event, "simulated device change with no hook installed"),
                    }
                    next_event = match next_event {
                        DeviceEvent::Removal => DeviceEvent::Arrival,
                        DeviceEvent::Arrival => DeviceEvent::Removal,
                    };
                }
            }
        }

        info!("simulated mouse hardware stopped");
    })
}
