//! Windows control device transport via `CreateFileW` / `DeviceIoControl`.
//!
//! Opens `\\.\MouHidInputHook` and issues the three buffered control codes.
//! A failed request surfaces the Win32 error the I/O manager translated the
//! driver's NTSTATUS into.

use std::ffi::c_void;
use std::iter;

use mouhid_core::protocol::{
    IOCTL_DISABLE_MOUHID_INPUT_MONITOR, IOCTL_ENABLE_MOUHID_INPUT_MONITOR,
    IOCTL_QUERY_MOUHID_INPUT_MONITOR,
};
use mouhid_core::QueryMonitorReply;
use tracing::error;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{CloseHandle, GENERIC_READ, GENERIC_WRITE, HANDLE};
use windows::Win32::Storage::FileSystem::{
    CreateFileW, FILE_ATTRIBUTE_NORMAL, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
};
use windows::Win32::System::IO::DeviceIoControl;

use crate::application::poll_monitor::{DeviceError, MonitorDevice};

/// Open handle on the MouHid control device.
pub struct WindowsDevice {
    handle: HANDLE,
}

// SAFETY: the handle is a kernel file handle owned by this struct. Win32 file
// handles may be used from any thread, and DeviceIoControl on a synchronous
// handle serialises concurrent requests in the I/O manager.
unsafe impl Send for WindowsDevice {}
unsafe impl Sync for WindowsDevice {}

impl WindowsDevice {
    /// Opens the control device at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Open`] if the driver is not loaded or access is
    /// denied.
    pub fn open(path: &str) -> Result<Self, DeviceError> {
        let wide: Vec<u16> = path.encode_utf16().chain(iter::once(0)).collect();

        // SAFETY: `wide` is NUL-terminated and outlives the call. No security
        // attributes or template handle are passed.
        let handle = unsafe {
            CreateFileW(
                PCWSTR(wide.as_ptr()),
                (GENERIC_READ | GENERIC_WRITE).0,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                None,
                OPEN_EXISTING,
                FILE_ATTRIBUTE_NORMAL,
                HANDLE::default(),
            )
        }
        .map_err(|e| DeviceError::Open {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { handle })
    }

    fn control(&self, code: u32, output: &mut [u8]) -> Result<usize, DeviceError> {
        let mut returned: u32 = 0;
        let output_ptr = if output.is_empty() {
            None
        } else {
            Some(output.as_mut_ptr() as *mut c_void)
        };

        // SAFETY: `output` is valid for `output.len()` bytes for the duration of
        // this synchronous call, and `returned` lives on the stack.
        unsafe {
            DeviceIoControl(
                self.handle,
                code,
                None,
                0,
                output_ptr,
                output.len() as u32,
                Some(&mut returned as *mut u32),
                None,
            )
        }
        .map_err(|e| DeviceError::Os(e.to_string()))?;

        Ok(returned as usize)
    }
}

impl MonitorDevice for WindowsDevice {
    fn query(&self) -> Result<bool, DeviceError> {
        let mut reply = [0u8; QueryMonitorReply::SIZE];
        let returned = self.control(IOCTL_QUERY_MOUHID_INPUT_MONITOR, &mut reply)?;
        Ok(QueryMonitorReply::decode(&reply[..returned])?.enabled)
    }

    fn enable(&self) -> Result<(), DeviceError> {
        self.control(IOCTL_ENABLE_MOUHID_INPUT_MONITOR, &mut [])?;
        Ok(())
    }

    fn disable(&self) -> Result<(), DeviceError> {
        self.control(IOCTL_DISABLE_MOUHID_INPUT_MONITOR, &mut [])?;
        Ok(())
    }
}

impl Drop for WindowsDevice {
    fn drop(&mut self) {
        // SAFETY: the handle was returned by CreateFileW and is closed once.
        if let Err(e) = unsafe { CloseHandle(self.handle) } {
            error!("CloseHandle failed: {e}");
        }
    }
}
