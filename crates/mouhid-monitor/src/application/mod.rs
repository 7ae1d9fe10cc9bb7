//! Application layer of the engine.
//!
//! - **`monitor`** – The registration state machine. Owns the single
//!   (handle, context) pair and serialises enable, disable, and device
//!   notifications behind one reader/writer lock.
//!
//! - **`intercept`** – The hot path. Runs once per packet batch on the
//!   delivery context, tags each packet, and forwards the batch.
//!
//! Both depend only on the traits in `infrastructure::hook_facility` and
//! `infrastructure::packet_log`, so tests drive them with in-process doubles.

pub mod intercept;
pub mod monitor;
