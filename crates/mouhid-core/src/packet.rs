//! Raw mouse input packet as delivered by the mouse class service callback.
//!
//! The layout mirrors `MOUSE_INPUT_DATA` from `ntddmou.h` so a batch handed to
//! the class driver can be viewed as a `&[MouseInputPacket]` without copying.

/// Indicator flags (`MOUSE_INPUT_DATA::Flags`).
pub mod flags {
    pub const MOUSE_MOVE_RELATIVE: u16 = 0x0000;
    pub const MOUSE_MOVE_ABSOLUTE: u16 = 0x0001;
    pub const MOUSE_VIRTUAL_DESKTOP: u16 = 0x0002;
    pub const MOUSE_ATTRIBUTES_CHANGED: u16 = 0x0004;
    pub const MOUSE_MOVE_NOCOALESCE: u16 = 0x0008;
}

/// Button transition flags (`MOUSE_INPUT_DATA::ButtonFlags`).
pub mod buttons {
    pub const LEFT_DOWN: u16 = 0x0001;
    pub const LEFT_UP: u16 = 0x0002;
    pub const RIGHT_DOWN: u16 = 0x0004;
    pub const RIGHT_UP: u16 = 0x0008;
    pub const MIDDLE_DOWN: u16 = 0x0010;
    pub const MIDDLE_UP: u16 = 0x0020;
    pub const BUTTON_4_DOWN: u16 = 0x0040;
    pub const BUTTON_4_UP: u16 = 0x0080;
    pub const BUTTON_5_DOWN: u16 = 0x0100;
    pub const BUTTON_5_UP: u16 = 0x0200;
    pub const WHEEL: u16 = 0x0400;
    pub const HWHEEL: u16 = 0x0800;
}

/// One raw mouse input packet.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MouseInputPacket {
    /// Unit number of the mouse device (`\Device\PointerPortN`).
    pub unit_id: u16,
    /// Movement indicator flags, see [`flags`].
    pub flags: u16,
    /// Button transitions, see [`buttons`].
    pub button_flags: u16,
    /// Wheel delta when a wheel flag is set.
    pub button_data: u16,
    /// Raw button state reported by the device.
    pub raw_buttons: u32,
    /// Signed relative (or absolute) X motion.
    pub last_x: i32,
    /// Signed relative (or absolute) Y motion.
    pub last_y: i32,
    /// Device-specific extra information.
    pub extra_information: u32,
}

impl MouseInputPacket {
    /// Creates a relative-motion packet with no button transitions.
    pub fn relative_move(unit_id: u16, dx: i32, dy: i32) -> Self {
        Self {
            unit_id,
            flags: flags::MOUSE_MOVE_RELATIVE,
            last_x: dx,
            last_y: dy,
            ..Self::default()
        }
    }

    /// Creates a packet carrying only button transitions.
    pub fn button(unit_id: u16, button_flags: u16) -> Self {
        Self {
            unit_id,
            button_flags,
            ..Self::default()
        }
    }
}
