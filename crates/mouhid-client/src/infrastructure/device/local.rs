//! In-process transport through the control gateway.
//!
//! Each request is marshalled exactly as the Windows client would send it:
//! a raw control code, an empty input buffer, and a one-byte output buffer
//! for queries. Opening the device calls `on_create`; dropping it calls
//! `on_close`, which triggers the gateway's disable safety net.

use mouhid_core::protocol::{
    IOCTL_DISABLE_MOUHID_INPUT_MONITOR, IOCTL_ENABLE_MOUHID_INPUT_MONITOR,
    IOCTL_QUERY_MOUHID_INPUT_MONITOR,
};
use mouhid_core::QueryMonitorReply;
use mouhid_monitor::ControlGateway;

use crate::application::poll_monitor::{DeviceError, MonitorDevice};

/// An open handle on an in-process [`ControlGateway`].
pub struct LocalDevice {
    gateway: ControlGateway,
}

impl LocalDevice {
    /// Opens the device.
    pub fn open(gateway: ControlGateway) -> Self {
        gateway.on_create();
        Self { gateway }
    }

    fn control(&self, code: u32) -> Result<(), DeviceError> {
        self.gateway.dispatch(code, &[], &mut [])?;
        Ok(())
    }
}

impl MonitorDevice for LocalDevice {
    fn query(&self) -> Result<bool, DeviceError> {
        let mut reply = [0u8; QueryMonitorReply::SIZE];
        self.gateway
            .dispatch(IOCTL_QUERY_MOUHID_INPUT_MONITOR, &[], &mut reply)?;
        Ok(QueryMonitorReply::decode(&reply)?.enabled)
    }

    fn enable(&self) -> Result<(), DeviceError> {
        self.control(IOCTL_ENABLE_MOUHID_INPUT_MONITOR)
    }

    fn disable(&self) -> Result<(), DeviceError> {
        self.control(IOCTL_DISABLE_MOUHID_INPUT_MONITOR)
    }
}

impl Drop for LocalDevice {
    fn drop(&mut self) {
        self.gateway.on_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mouhid_core::MonitorError;
    use mouhid_monitor::infrastructure::hook_facility::mock::{
        MockHookFacility, RecordingClassService,
    };
    use mouhid_monitor::infrastructure::hook_facility::ClassDeviceId;
    use mouhid_monitor::infrastructure::packet_log::RecordingPacketLogger;
    use mouhid_monitor::{Monitor, MonitorOptions};

    fn open() -> (LocalDevice, Arc<MockHookFacility>) {
        let facility = Arc::new(MockHookFacility::new(Arc::new(RecordingClassService::new(
            ClassDeviceId(1),
        ))));
        let monitor = Monitor::load(
            facility.clone(),
            Arc::new(RecordingPacketLogger::new()),
            MonitorOptions::default(),
        );
        let device = LocalDevice::open(ControlGateway::new(Arc::new(monitor)));
        (device, facility)
    }

    #[test]
    fn test_local_device_round_trip() {
        // Arrange
        let (device, facility) = open();

        // Act / Assert
        assert!(!device.query().unwrap());
        device.enable().expect("enable should succeed");
        assert!(device.query().unwrap());
        assert!(facility.is_hooked());
        device.disable().expect("disable should succeed");
        assert!(!device.query().unwrap());
    }

    #[test]
    fn test_local_device_surfaces_rejection_status() {
        let (device, _) = open();
        device.enable().unwrap();

        let err = device.enable().unwrap_err();

        assert!(matches!(
            err,
            DeviceError::Rejected(MonitorError::AlreadyRegistered)
        ));
    }

    #[test]
    fn test_dropping_device_disables_monitor() {
        // Arrange
        let (device, facility) = open();
        device.enable().unwrap();

        // Act
        drop(device);

        // Assert
        assert!(!facility.is_hooked());
    }
}
