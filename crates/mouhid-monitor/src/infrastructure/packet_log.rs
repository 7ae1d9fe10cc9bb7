//! Side-channel logging of intercepted packets.
//!
//! The interception callback hands one [`PacketRecord`] per packet to a
//! [`PacketLogger`]. The production logger emits a `tracing` event on the
//! `mouhid::packet` target so packet records can be filtered separately from
//! the engine's own diagnostics, e.g. `RUST_LOG=mouhid::packet=info`.

use std::sync::Mutex;

use mouhid_core::MouseInputPacket;
use tracing::info;

use crate::infrastructure::hook_facility::ClassDeviceId;

/// Target used for packet records.
pub const PACKET_LOG_TARGET: &str = "mouhid::packet";

/// One tagged packet.
#[derive(Debug, Clone, Copy)]
pub struct PacketRecord<'a> {
    /// Sequence number within the current registration, starting at 1.
    pub index: u64,
    /// Class device object the packet was addressed to.
    pub device: ClassDeviceId,
    /// The packet exactly as delivered.
    pub packet: &'a MouseInputPacket,
}

/// Sink for packet records. Called on the delivery context.
pub trait PacketLogger: Send + Sync {
    fn log_packet(&self, record: &PacketRecord<'_>);
}

/// Emits each record as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPacketLogger;

impl PacketLogger for TracingPacketLogger {
    fn log_packet(&self, record: &PacketRecord<'_>) {
        let p = record.packet;
        info!(
            target: PACKET_LOG_TARGET,
            index = record.index,
            device = %record.device,
            unit_id = p.unit_id,
            flags = p.flags,
            button_flags = p.button_flags,
            button_data = p.button_data,
            raw_buttons = p.raw_buttons,
            last_x = p.last_x,
            last_y = p.last_y,
            extra_information = p.extra_information,
            "Intercepted packet."
        );
    }
}

/// Records every packet in memory; used by tests and the simulator.
#[derive(Debug, Default)]
pub struct RecordingPacketLogger {
    records: Mutex<Vec<(u64, ClassDeviceId, MouseInputPacket)>>,
}

impl RecordingPacketLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence numbers in the order they were logged.
    pub fn indices(&self) -> Vec<u64> {
        self.lock().iter().map(|(index, _, _)| *index).collect()
    }

    /// Packets in the order they were logged.
    pub fn packets(&self) -> Vec<MouseInputPacket> {
        self.lock().iter().map(|(_, _, packet)| *packet).collect()
    }

    /// Class devices in the order they were logged.
    pub fn devices(&self) -> Vec<ClassDeviceId> {
        self.lock().iter().map(|(_, device, _)| *device).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, ClassDeviceId, MouseInputPacket)>> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl PacketLogger for RecordingPacketLogger {
    fn log_packet(&self, record: &PacketRecord<'_>) {
        self.lock().push((record.index, record.device, *record.packet));
    }
}
