//! Steam Controller type definitions
//!
//! This module defines the basic data types shared by the decoder, the state
//! tracker and the mapping layer: logical input identities, event flags and
//! the input events themselves.

use crate::steamcon::constants::*;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Every physical control the controller reports.
///
/// The declaration order is the emission order of the state tracker:
/// continuous axes first, then buttons in bit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogicalInput {
    // Continuous axes
    LeftTrigger,
    RightTrigger,
    Motion,
    Stick,

    // Edge-triggered controls
    RGrip,
    LPadClick,
    RPadClick,
    LPadTouch,
    RPadTouch,
    StickClick,
    DPadUp,
    DPadRight,
    DPadLeft,
    DPadDown,
    Back,
    Steam,
    Forward,
    LGrip,
    RTriggerClick,
    LTriggerClick,
    RBumper,
    LBumper,
    Y,
    B,
    X,
    A,
}

impl LogicalInput {
    /// Edge-triggered controls in emission order
    pub const BUTTONS: [LogicalInput; 22] = [
        LogicalInput::RGrip,
        LogicalInput::LPadClick,
        LogicalInput::RPadClick,
        LogicalInput::LPadTouch,
        LogicalInput::RPadTouch,
        LogicalInput::StickClick,
        LogicalInput::DPadUp,
        LogicalInput::DPadRight,
        LogicalInput::DPadLeft,
        LogicalInput::DPadDown,
        LogicalInput::Back,
        LogicalInput::Steam,
        LogicalInput::Forward,
        LogicalInput::LGrip,
        LogicalInput::RTriggerClick,
        LogicalInput::LTriggerClick,
        LogicalInput::RBumper,
        LogicalInput::LBumper,
        LogicalInput::Y,
        LogicalInput::B,
        LogicalInput::X,
        LogicalInput::A,
    ];

    /// Bit mask of an edge-triggered control, `None` for continuous axes
    pub fn mask(self) -> Option<u32> {
        let mask = match self {
            LogicalInput::LeftTrigger
            | LogicalInput::RightTrigger
            | LogicalInput::Motion
            | LogicalInput::Stick => return None,
            LogicalInput::RGrip => MASK_RGRIP,
            LogicalInput::LPadClick => MASK_LPAD_CLICK,
            LogicalInput::RPadClick => MASK_RPAD_CLICK,
            LogicalInput::LPadTouch => MASK_LPAD_TOUCH,
            LogicalInput::RPadTouch => MASK_RPAD_TOUCH,
            LogicalInput::StickClick => MASK_STICK_CLICK,
            LogicalInput::DPadUp => MASK_DPAD_UP,
            LogicalInput::DPadRight => MASK_DPAD_RIGHT,
            LogicalInput::DPadLeft => MASK_DPAD_LEFT,
            LogicalInput::DPadDown => MASK_DPAD_DOWN,
            LogicalInput::Back => MASK_BACK,
            LogicalInput::Steam => MASK_STEAM,
            LogicalInput::Forward => MASK_FORWARD,
            LogicalInput::LGrip => MASK_LGRIP,
            LogicalInput::RTriggerClick => MASK_RTRIGGER_CLICK,
            LogicalInput::LTriggerClick => MASK_LTRIGGER_CLICK,
            LogicalInput::RBumper => MASK_RBUMPER,
            LogicalInput::LBumper => MASK_LBUMPER,
            LogicalInput::Y => MASK_Y,
            LogicalInput::B => MASK_B,
            LogicalInput::X => MASK_X,
            LogicalInput::A => MASK_A,
        };
        Some(mask)
    }

    /// Pad touches and clicks carry a position and are re-emitted while held
    pub fn is_trackpad(self) -> bool {
        matches!(
            self,
            LogicalInput::LPadClick
                | LogicalInput::RPadClick
                | LogicalInput::LPadTouch
                | LogicalInput::RPadTouch
        )
    }

    /// Triggers, stick and motion are present every frame
    pub fn is_continuous(self) -> bool {
        self.mask().is_none()
    }
}

bitflags! {
    /// Edge and movement flags attached to every event
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        const PRESSED = 1 << 0;
        const RELEASED = 1 << 1;
        const RELATIVE_MOVE = 1 << 2;
        const ABSOLUTE_MOVE = 1 << 3;
    }
}

/// Pad or stick coordinates in the full signed 16-bit range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i16,
    pub y: i16,
}

impl Position {
    pub const NEUTRAL: Position = Position { x: 0, y: 0 };

    pub fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    /// Distance from the origin
    pub fn magnitude(&self) -> f64 {
        (self.x as f64).hypot(self.y as f64)
    }

    /// Angle from the positive x axis in units of π, in `[0, 2)`
    pub fn angle(&self) -> f64 {
        normalized_angle(self.y as f64, self.x as f64)
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }
}

/// `atan2` in units of π folded into `[0, 2)`
pub fn normalized_angle(y: f64, x: f64) -> f64 {
    let theta = y.atan2(x) / std::f64::consts::PI;
    if theta < 0.0 {
        theta + 2.0
    } else {
        theta
    }
}

/// Raw orientation quaternion as reported by the IMU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub w: i16,
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// Raw accelerometer reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Acceleration {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// A single semantically labeled input event
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Plain digital control
    Button {
        input: LogicalInput,
        flags: Flags,
        time_held: Option<Duration>,
    },
    /// Analog trigger pull (0..=255)
    Trigger {
        input: LogicalInput,
        pull: u8,
        is_left: bool,
        flags: Flags,
    },
    /// Analog stick deflection
    Stick { position: Position, flags: Flags },
    /// Pad touch or click with its rotated coordinates
    Trackpad {
        input: LogicalInput,
        position: Position,
        flags: Flags,
        time_held: Option<Duration>,
    },
    /// IMU sample
    Motion {
        orientation: Orientation,
        acceleration: Acceleration,
        flags: Flags,
    },
}

impl InputEvent {
    /// Fresh press of a digital control
    pub fn button_press(input: LogicalInput) -> Self {
        InputEvent::Button {
            input,
            flags: Flags::PRESSED,
            time_held: None,
        }
    }

    /// Fresh touch or click of a pad at `position`
    pub fn trackpad_press(input: LogicalInput, position: Position) -> Self {
        InputEvent::Trackpad {
            input,
            position,
            flags: Flags::PRESSED | Flags::ABSOLUTE_MOVE,
            time_held: None,
        }
    }

    pub fn trigger(input: LogicalInput, pull: u8) -> Self {
        InputEvent::Trigger {
            input,
            pull,
            is_left: input == LogicalInput::LeftTrigger,
            flags: Flags::ABSOLUTE_MOVE,
        }
    }

    pub fn stick(position: Position) -> Self {
        InputEvent::Stick {
            position,
            flags: Flags::ABSOLUTE_MOVE,
        }
    }

    pub fn motion(orientation: Orientation, acceleration: Acceleration) -> Self {
        InputEvent::Motion {
            orientation,
            acceleration,
            flags: Flags::ABSOLUTE_MOVE,
        }
    }

    pub fn input(&self) -> LogicalInput {
        match self {
            InputEvent::Button { input, .. }
            | InputEvent::Trigger { input, .. }
            | InputEvent::Trackpad { input, .. } => *input,
            InputEvent::Stick { .. } => LogicalInput::Stick,
            InputEvent::Motion { .. } => LogicalInput::Motion,
        }
    }

    pub fn flags(&self) -> Flags {
        match self {
            InputEvent::Button { flags, .. }
            | InputEvent::Trigger { flags, .. }
            | InputEvent::Stick { flags, .. }
            | InputEvent::Trackpad { flags, .. }
            | InputEvent::Motion { flags, .. } => *flags,
        }
    }

    pub fn is_press(&self) -> bool {
        self.flags().contains(Flags::PRESSED)
    }

    pub fn is_release(&self) -> bool {
        self.flags().contains(Flags::RELEASED)
    }

    /// Re-emitted pad sample while the pad stays touched
    pub fn is_hold(&self) -> bool {
        matches!(self, InputEvent::Trackpad { .. }) && !self.is_press() && !self.is_release()
    }

    /// Digital controls and pads; anything a button can be bound to
    pub fn is_button(&self) -> bool {
        matches!(self, InputEvent::Button { .. } | InputEvent::Trackpad { .. })
    }

    /// How long the control was held, set on release events
    pub fn time_held(&self) -> Option<Duration> {
        match self {
            InputEvent::Button { time_held, .. } | InputEvent::Trackpad { time_held, .. } => {
                *time_held
            }
            _ => None,
        }
    }

    /// Coordinates carried by stick and pad events
    pub fn position(&self) -> Option<Position> {
        match self {
            InputEvent::Stick { position, .. } | InputEvent::Trackpad { position, .. } => {
                Some(*position)
            }
            _ => None,
        }
    }

    /// Same payload, re-labeled as a held sample (no edge flags)
    pub fn as_hold(&self) -> Self {
        let mut event = self.clone();
        if let InputEvent::Trackpad { flags, time_held, .. } = &mut event {
            flags.remove(Flags::PRESSED | Flags::RELEASED);
            *time_held = None;
        }
        event
    }

    /// Same payload, re-labeled as the release of a control held for `held`
    pub fn as_release(&self, held: Duration) -> Self {
        let mut event = self.clone();
        match &mut event {
            InputEvent::Button { flags, time_held, .. }
            | InputEvent::Trackpad { flags, time_held, .. } => {
                flags.remove(Flags::PRESSED);
                flags.insert(Flags::RELEASED);
                *time_held = Some(held);
            }
            _ => {}
        }
        event
    }

    /// Short human-readable kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            InputEvent::Button { .. } => "button",
            InputEvent::Trigger { .. } => "trigger",
            InputEvent::Stick { .. } => "stick",
            InputEvent::Trackpad { .. } => "trackpad",
            InputEvent::Motion { .. } => "motion",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emission_order_follows_declaration() {
        assert!(LogicalInput::LeftTrigger < LogicalInput::RightTrigger);
        assert!(LogicalInput::Motion < LogicalInput::Stick);
        assert!(LogicalInput::Stick < LogicalInput::RGrip);
        assert!(LogicalInput::X < LogicalInput::A);

        let mut sorted = LogicalInput::BUTTONS.to_vec();
        sorted.sort();
        assert_eq!(sorted, LogicalInput::BUTTONS.to_vec());
    }

    #[test]
    fn test_release_keeps_payload() {
        let press = InputEvent::trackpad_press(LogicalInput::RPadTouch, Position::new(100, -200));
        let release = press.as_release(Duration::from_millis(42));

        assert!(release.is_release());
        assert!(!release.is_press());
        assert!(release.flags().contains(Flags::ABSOLUTE_MOVE));
        assert_eq!(release.position(), Some(Position::new(100, -200)));
        assert_eq!(release.time_held(), Some(Duration::from_millis(42)));
    }

    #[test]
    fn test_hold_has_no_edge() {
        let press = InputEvent::trackpad_press(LogicalInput::LPadTouch, Position::new(1, 2));
        let hold = press.as_hold();
        assert!(hold.is_hold());
        assert!(!press.is_hold());
    }

    #[test]
    fn test_angle_is_folded() {
        assert_eq!(Position::new(100, 0).angle(), 0.0);
        assert!((Position::new(0, 100).angle() - 0.5).abs() < 1e-12);
        assert!((Position::new(0, -100).angle() - 1.5).abs() < 1e-12);
        assert_eq!(Position::new(500, 500).angle(), 0.25);
    }
}
