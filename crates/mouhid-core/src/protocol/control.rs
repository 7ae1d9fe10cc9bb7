//! Device names and control codes shared by the gateway and the client.
//!
//! Control codes are built exactly like the `CTL_CODE` macro from
//! `devioctl.h`:
//!
//! ```text
//! [device_type:16][access:2][function:12][method:2]
//! ```

use std::fmt;

/// Base name of the device.
pub const DRIVER_NAME: &str = "MouHidInputHook";
/// Path a user-mode client opens.
pub const LOCAL_DEVICE_PATH: &str = concat!(r"\\.\", "MouHidInputHook");
/// Kernel object-manager name of the device.
pub const NT_DEVICE_NAME: &str = concat!(r"\Device\", "MouHidInputHook");
/// Symbolic link published for the client.
pub const SYMBOLIC_LINK_NAME: &str = concat!(r"\DosDevices\", "MouHidInputHook");

/// Custom device type in the vendor range.
pub const FILE_DEVICE_MOUHID_INPUT_HOOK: u32 = 51382;

pub const METHOD_BUFFERED: u32 = 0;
pub const FILE_ANY_ACCESS: u32 = 0;

/// Equivalent of the `CTL_CODE` macro.
pub const fn ctl_code(device_type: u32, function: u32, method: u32, access: u32) -> u32 {
    (device_type << 16) | (access << 14) | (function << 2) | method
}

pub const IOCTL_QUERY_MOUHID_INPUT_MONITOR: u32 =
    ctl_code(FILE_DEVICE_MOUHID_INPUT_HOOK, 3300, METHOD_BUFFERED, FILE_ANY_ACCESS);
pub const IOCTL_ENABLE_MOUHID_INPUT_MONITOR: u32 =
    ctl_code(FILE_DEVICE_MOUHID_INPUT_HOOK, 3500, METHOD_BUFFERED, FILE_ANY_ACCESS);
pub const IOCTL_DISABLE_MOUHID_INPUT_MONITOR: u32 =
    ctl_code(FILE_DEVICE_MOUHID_INPUT_HOOK, 3501, METHOD_BUFFERED, FILE_ANY_ACCESS);

/// The three operations understood by the control gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCode {
    /// Reply with a one-byte `Enabled` flag.
    QueryMonitor,
    /// Install the interception hook.
    EnableMonitor,
    /// Remove the interception hook.
    DisableMonitor,
}

impl ControlCode {
    /// Returns the raw control code sent across the boundary.
    pub const fn code(self) -> u32 {
        match self {
            ControlCode::QueryMonitor => IOCTL_QUERY_MOUHID_INPUT_MONITOR,
            ControlCode::EnableMonitor => IOCTL_ENABLE_MOUHID_INPUT_MONITOR,
            ControlCode::DisableMonitor => IOCTL_DISABLE_MOUHID_INPUT_MONITOR,
        }
    }

    /// Maps a raw control code back to an operation, or `None` if unknown.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            IOCTL_QUERY_MOUHID_INPUT_MONITOR => Some(ControlCode::QueryMonitor),
            IOCTL_ENABLE_MOUHID_INPUT_MONITOR => Some(ControlCode::EnableMonitor),
            IOCTL_DISABLE_MOUHID_INPUT_MONITOR => Some(ControlCode::DisableMonitor),
            _ => None,
        }
    }
}

impl fmt::Display for ControlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlCode::QueryMonitor => "IOCTL_QUERY_MOUHID_INPUT_MONITOR",
            ControlCode::EnableMonitor => "IOCTL_ENABLE_MOUHID_INPUT_MONITOR",
            ControlCode::DisableMonitor => "IOCTL_DISABLE_MOUHID_INPUT_MONITOR",
        };
        f.write_str(name)
    }
}
