//! Packet interception: the hot path.
//!
//! [`PacketInterceptor::intercept`] runs once per packet batch on whatever
//! context the class driver delivers input on. It must stay lock-free and
//! allocation-free: the only shared state it touches is the atomic counter
//! inside [`CallbackContext`].
//!
//! Every packet is tagged with the next counter value and handed to the
//! [`PacketLogger`]; the untouched batch is then forwarded to the original
//! class service callback and its consumed count is returned as-is.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mouhid_core::{MouseInputPacket, PacketSequence};

use crate::infrastructure::hook_facility::ClassService;
use crate::infrastructure::packet_log::{PacketLogger, PacketRecord};

/// Per-registration state shared with the hook facility.
///
/// Created fresh (counter at 0) by every successful or attempted enable and
/// retired exactly once when that registration ends.
#[derive(Debug, Default)]
pub struct CallbackContext {
    packet_index: PacketSequence,
    retired: AtomicBool,
}

impl CallbackContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tag for the next packet of this registration.
    pub fn next_packet_index(&self) -> u64 {
        self.packet_index.advance()
    }

    /// Returns the last tag handed out (0 before the first packet).
    #[cfg(test)]
    pub(crate) fn last_packet_index(&self) -> u64 {
        self.packet_index.current()
    }

    /// Returns `true` once the owning registration has released the context.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Marks the context released.
    ///
    /// # Panics
    ///
    /// Panics if the context was already retired: every context has exactly
    /// one release path.
    pub(crate) fn retire(&self) {
        let already_retired = self.retired.swap(true, Ordering::AcqRel);
        assert!(!already_retired, "callback context released more than once");
    }
}

/// Tags, logs, and forwards packet batches.
#[derive(Clone)]
pub struct PacketInterceptor {
    logger: Arc<dyn PacketLogger>,
}

impl PacketInterceptor {
    pub fn new(logger: Arc<dyn PacketLogger>) -> Self {
        Self { logger }
    }

    /// Processes one batch and forwards it to `original`.
    ///
    /// Returns the number of packets `original` reports as consumed.
    pub fn intercept(
        &self,
        context: &CallbackContext,
        original: &dyn ClassService,
        packets: &[MouseInputPacket],
    ) -> usize {
        debug_assert!(
            !context.is_retired(),
            "packet batch delivered on a released callback context"
        );

        let device = original.class_device();
        for packet in packets {
            let index = context.next_packet_index();
            self.logger.log_packet(&PacketRecord {
                index,
                device,
                packet,
            });
        }

        original.service(packets)
    }
}
