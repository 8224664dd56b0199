//! Steam Controller wire protocol constants
//!
//! This module contains the constants needed to decode the controller's
//! periodic input reports:
//! - Frame type discriminators
//! - Button bit masks (24-bit, byte-reversed mask from bytes 8..=10)
//! - Byte offsets of the analog fields
//! - Analog ranges and pad rotation

// ============================================================================
// Frame Layout
// ============================================================================

/// Offset of the frame type discriminator
pub const FRAME_TYPE_OFFSET: usize = 2;

/// Input report (buttons, pads, triggers, motion)
pub const FRAME_TYPE_INPUT: u8 = 0x01;

/// Connection status report (wireless dongle)
pub const FRAME_TYPE_CONNECTION: u8 = 0x03;

/// Battery / state report
pub const FRAME_TYPE_STATE: u8 = 0x04;

/// Minimum length of a decodable input report (last field ends at byte 47)
pub const MIN_INPUT_REPORT_LEN: usize = 48;

/// Button mask bytes (most significant first once reversed)
pub const BUTTONS_OFFSET: usize = 8;

/// Left trigger pull
pub const LEFT_TRIGGER_OFFSET: usize = 11;

/// Right trigger pull
pub const RIGHT_TRIGGER_OFFSET: usize = 12;

/// Shared left pad / stick coordinate slot (x at 16, y at 18)
pub const SLOT_A_OFFSET: usize = 16;

/// Right pad coordinate slot (x at 20, y at 22)
pub const SLOT_B_OFFSET: usize = 20;

/// Accelerometer x, y, z
pub const ACCELERATION_OFFSET: usize = 34;

/// Orientation quaternion w, x, y, z
pub const ORIENTATION_OFFSET: usize = 40;

// ============================================================================
// Button Masks
// ============================================================================

pub const MASK_RGRIP: u32 = 0x00_0001;
pub const MASK_LPAD_CLICK: u32 = 0x00_0002;
pub const MASK_RPAD_CLICK: u32 = 0x00_0004;
pub const MASK_LPAD_TOUCH: u32 = 0x00_0008;
pub const MASK_RPAD_TOUCH: u32 = 0x00_0010;
/// Stick click shares its low bit with the left pad click
pub const MASK_STICK_CLICK: u32 = 0x00_0042;
/// Set while the left pad and the stick alternate in slot A
pub const MASK_OSCILLATING: u32 = 0x00_0080;
pub const MASK_DPAD_UP: u32 = 0x00_0100;
pub const MASK_DPAD_RIGHT: u32 = 0x00_0200;
pub const MASK_DPAD_LEFT: u32 = 0x00_0400;
pub const MASK_DPAD_DOWN: u32 = 0x00_0800;
pub const MASK_BACK: u32 = 0x00_1000;
pub const MASK_STEAM: u32 = 0x00_2000;
pub const MASK_FORWARD: u32 = 0x00_4000;
pub const MASK_LGRIP: u32 = 0x00_8000;
pub const MASK_RTRIGGER_CLICK: u32 = 0x01_0000;
pub const MASK_LTRIGGER_CLICK: u32 = 0x02_0000;
pub const MASK_RBUMPER: u32 = 0x04_0000;
pub const MASK_LBUMPER: u32 = 0x08_0000;
pub const MASK_Y: u32 = 0x10_0000;
pub const MASK_B: u32 = 0x20_0000;
pub const MASK_X: u32 = 0x40_0000;
pub const MASK_A: u32 = 0x80_0000;

// ============================================================================
// Analog Ranges
// ============================================================================

/// Pull value reported when a trigger reaches its click switch.
/// Values above it are only reached by pressing through the switch.
pub const TRIGGER_SOFT_RANGE: u8 = 237;

/// Pad coordinates are rotated by this many degrees (left pad negative)
pub const PAD_ROTATION_DEGREES: f64 = 15.0;

/// Full extent of a 16-bit axis (`i16::MIN..=i16::MAX`)
pub const AXIS_FULL_RANGE: f64 = 65535.0;

/// Largest deflection along one axis
pub const AXIS_MAX: f64 = i16::MAX as f64;
