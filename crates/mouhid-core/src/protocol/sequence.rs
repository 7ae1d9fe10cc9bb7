//! Lock-free packet sequence counter.
//!
//! Every packet observed by the interception callback is tagged with the
//! value returned by [`PacketSequence::advance`]. Overlapping batches can be
//! delivered on different cores at the same time, so the counter is a plain
//! `AtomicU64` rather than anything behind a lock: `fetch_add` hands each
//! caller a distinct value without blocking.

use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe, monotonically increasing packet counter.
///
/// The counter starts at 0 and the first call to [`advance`](Self::advance)
/// returns 1, so the tags observed for a registration are exactly `1..=N`.
/// The counter wraps from `u64::MAX` to 0 without panicking.
///
/// # Examples
///
/// ```rust
/// use mouhid_core::protocol::PacketSequence;
///
/// let sequence = PacketSequence::new();
/// assert_eq!(sequence.advance(), 1);
/// assert_eq!(sequence.advance(), 2);
/// assert_eq!(sequence.current(), 2);
/// ```
#[derive(Debug)]
pub struct PacketSequence {
    inner: AtomicU64,
}

impl PacketSequence {
    /// Creates a new counter at 0.
    pub const fn new() -> Self {
        Self {
            inner: AtomicU64::new(0),
        }
    }

    /// Atomically increments the counter and returns the *new* value.
    ///
    /// `Relaxed` is enough: the tag only has to be unique and ordered per
    /// counter, it does not publish any other memory.
    pub fn advance(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Returns the last value handed out, without incrementing.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for PacketSequence {
    fn default() -> Self {
        Self::new()
    }
}
