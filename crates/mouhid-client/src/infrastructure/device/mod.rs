//! Transports for talking to the monitor.
//!
//! - **`local`** – Drives an in-process `ControlGateway` with the same
//!   control codes and buffers the Windows driver receives.
//! - **`simulated`** – Hosts the engine on a mock hook facility and feeds it
//!   synthetic packet batches and hot-plug events.
//! - **`windows`** – Opens `\\.\MouHidInputHook` and issues `DeviceIoControl`
//!   requests. Compiled only on Windows.

pub mod local;
pub mod simulated;

#[cfg(target_os = "windows")]
pub mod windows;
