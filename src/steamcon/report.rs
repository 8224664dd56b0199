//! Input report decoder
//!
//! Turns one raw frame into the set of logical inputs that are active in it.
//! Decoding is stateless: edge detection happens in [`crate::steamcon::state`].

use crate::steamcon::constants::*;
use crate::steamcon::types::{Acceleration, InputEvent, LogicalInput, Orientation, Position};
use log::trace;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Frame too short: {len} bytes (need at least {expected})")]
    TooShort { len: usize, expected: usize },
}

/// Frame type discriminator at byte 2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Input,
    Connection,
    State,
    Unknown(u8),
}

impl From<u8> for FrameType {
    fn from(value: u8) -> Self {
        match value {
            FRAME_TYPE_INPUT => FrameType::Input,
            FRAME_TYPE_CONNECTION => FrameType::Connection,
            FRAME_TYPE_STATE => FrameType::State,
            other => FrameType::Unknown(other),
        }
    }
}

/// Everything one input frame reports, keyed by identity in emission order
#[derive(Debug, Clone, PartialEq)]
pub struct InputReport {
    /// Raw press-shaped event per active identity
    pub inputs: BTreeMap<LogicalInput, InputEvent>,
    /// Left pad and stick are alternating in slot A
    pub oscillating: bool,
    /// Raw 24-bit button mask
    pub buttons: u32,
}

impl InputReport {
    pub fn get(&self, input: LogicalInput) -> Option<&InputEvent> {
        self.inputs.get(&input)
    }

    pub fn contains(&self, input: LogicalInput) -> bool {
        self.inputs.contains_key(&input)
    }
}

/// Read the frame type without decoding anything else
pub fn frame_type(data: &[u8]) -> Result<FrameType, DecodeError> {
    match data.get(FRAME_TYPE_OFFSET) {
        Some(byte) => Ok(FrameType::from(*byte)),
        None => Err(DecodeError::TooShort {
            len: data.len(),
            expected: FRAME_TYPE_OFFSET + 1,
        }),
    }
}

/// Decode a raw frame.
///
/// Returns `Ok(None)` for frames that are not input reports.
pub fn decode(data: &[u8]) -> Result<Option<InputReport>, DecodeError> {
    let kind = frame_type(data)?;
    if kind != FrameType::Input {
        trace!("Skipping {:?} frame", kind);
        return Ok(None);
    }
    if data.len() < MIN_INPUT_REPORT_LEN {
        return Err(DecodeError::TooShort {
            len: data.len(),
            expected: MIN_INPUT_REPORT_LEN,
        });
    }
    Ok(Some(decode_input(data)))
}

fn decode_input(data: &[u8]) -> InputReport {
    let buttons = ((data[BUTTONS_OFFSET] as u32) << 16)
        | ((data[BUTTONS_OFFSET + 1] as u32) << 8)
        | (data[BUTTONS_OFFSET + 2] as u32);
    let oscillating = buttons & MASK_OSCILLATING == MASK_OSCILLATING;

    let slot_a = read_position(data, SLOT_A_OFFSET);
    let slot_b = read_position(data, SLOT_B_OFFSET);
    let left_pad = rotate(slot_a, -PAD_ROTATION_DEGREES);
    let right_pad = rotate(slot_b, PAD_ROTATION_DEGREES);

    let mut inputs = BTreeMap::new();

    inputs.insert(
        LogicalInput::LeftTrigger,
        InputEvent::trigger(LogicalInput::LeftTrigger, data[LEFT_TRIGGER_OFFSET]),
    );
    inputs.insert(
        LogicalInput::RightTrigger,
        InputEvent::trigger(LogicalInput::RightTrigger, data[RIGHT_TRIGGER_OFFSET]),
    );

    let acceleration = Acceleration {
        x: read_i16(data, ACCELERATION_OFFSET),
        y: read_i16(data, ACCELERATION_OFFSET + 2),
        z: read_i16(data, ACCELERATION_OFFSET + 4),
    };
    let orientation = Orientation {
        w: read_i16(data, ORIENTATION_OFFSET),
        x: read_i16(data, ORIENTATION_OFFSET + 2),
        y: read_i16(data, ORIENTATION_OFFSET + 4),
        z: read_i16(data, ORIENTATION_OFFSET + 6),
    };
    inputs.insert(LogicalInput::Motion, InputEvent::motion(orientation, acceleration));

    for input in LogicalInput::BUTTONS {
        let Some(mask) = input.mask() else { continue };
        if buttons & mask != mask {
            continue;
        }
        let event = match input {
            LogicalInput::LPadClick | LogicalInput::LPadTouch => {
                InputEvent::trackpad_press(input, left_pad)
            }
            LogicalInput::RPadClick | LogicalInput::RPadTouch => {
                InputEvent::trackpad_press(input, right_pad)
            }
            _ => InputEvent::button_press(input),
        };
        inputs.insert(input, event);
    }

    // Slot A belongs to the pad while it is touched; the stick reads neutral
    // then, or is absent altogether while the two oscillate.
    if buttons & MASK_LPAD_TOUCH == 0 {
        inputs.insert(LogicalInput::Stick, InputEvent::stick(slot_a));
    } else if !oscillating {
        inputs.insert(LogicalInput::Stick, InputEvent::stick(Position::NEUTRAL));
    }

    InputReport {
        inputs,
        oscillating,
        buttons,
    }
}

fn read_i16(data: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_position(data: &[u8], offset: usize) -> Position {
    Position::new(read_i16(data, offset), read_i16(data, offset + 2))
}

/// Rotate a pad sample around the origin, clamped to the 16-bit range
pub fn rotate(position: Position, degrees: f64) -> Position {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let x = position.x as f64;
    let y = position.y as f64;
    let xp = x * cos - y * sin;
    let yp = x * sin + y * cos;
    Position::new(clamp_i16(xp), clamp_i16(yp))
}

fn clamp_i16(value: f64) -> i16 {
    value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Builder for synthetic input frames, used by tests and the replay tool
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    data: Vec<u8>,
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuilder {
    pub fn new() -> Self {
        let mut data = vec![0u8; 64];
        data[FRAME_TYPE_OFFSET] = FRAME_TYPE_INPUT;
        Self { data }
    }

    pub fn buttons(mut self, mask: u32) -> Self {
        self.data[BUTTONS_OFFSET] = (mask >> 16) as u8;
        self.data[BUTTONS_OFFSET + 1] = (mask >> 8) as u8;
        self.data[BUTTONS_OFFSET + 2] = mask as u8;
        self
    }

    pub fn triggers(mut self, left: u8, right: u8) -> Self {
        self.data[LEFT_TRIGGER_OFFSET] = left;
        self.data[RIGHT_TRIGGER_OFFSET] = right;
        self
    }

    pub fn slot_a(self, x: i16, y: i16) -> Self {
        self.write_i16(SLOT_A_OFFSET, x).write_i16(SLOT_A_OFFSET + 2, y)
    }

    pub fn slot_b(self, x: i16, y: i16) -> Self {
        self.write_i16(SLOT_B_OFFSET, x).write_i16(SLOT_B_OFFSET + 2, y)
    }

    pub fn orientation(self, w: i16, x: i16, y: i16, z: i16) -> Self {
        self.write_i16(ORIENTATION_OFFSET, w)
            .write_i16(ORIENTATION_OFFSET + 2, x)
            .write_i16(ORIENTATION_OFFSET + 4, y)
            .write_i16(ORIENTATION_OFFSET + 6, z)
    }

    pub fn acceleration(self, x: i16, y: i16, z: i16) -> Self {
        self.write_i16(ACCELERATION_OFFSET, x)
            .write_i16(ACCELERATION_OFFSET + 2, y)
            .write_i16(ACCELERATION_OFFSET + 4, z)
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }

    fn write_i16(mut self, offset: usize, value: i16) -> Self {
        let [lo, hi] = value.to_le_bytes();
        self.data[offset] = lo;
        self.data[offset + 1] = hi;
        self
    }
}
