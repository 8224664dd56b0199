//! Directional cross-mapping
//!
//! Maps a stick or pad position onto four cardinal buttons, plus optional
//! inner and outer ring buttons. With overlap, each direction covers 3/4 π
//! so diagonals press two neighbours; without, each covers exactly 1/2 π.
//! Arc lower bounds are inclusive and upper bounds exclusive.

use crate::mapping::actuators::button::Button;
use crate::mapping::actuators::{check_fraction, Actuate, ActuatorError};
use crate::steamcon::constants::AXIS_MAX;
use crate::steamcon::types::{InputEvent, Position};
use log::warn;

/// Half-open arcs in units of π; East wraps around 0
const OVERLAP_ARCS: [(f64, f64); 4] = [
    (13.0 / 8.0, 3.0 / 8.0),
    (1.0 / 8.0, 7.0 / 8.0),
    (5.0 / 8.0, 11.0 / 8.0),
    (9.0 / 8.0, 15.0 / 8.0),
];

const EXCLUSIVE_ARCS: [(f64, f64); 4] = [
    (1.75, 0.25),
    (0.25, 0.75),
    (0.75, 1.25),
    (1.25, 1.75),
];

fn in_arc(theta: f64, (lower, upper): (f64, f64)) -> bool {
    if lower > upper {
        theta >= lower || theta < upper
    } else {
        theta >= lower && theta < upper
    }
}

/// Four-way (plus rings) button mapping of a 2D position
#[derive(Debug)]
pub struct ButtonCross {
    /// East, North, West, South
    directions: [Button; 4],
    inner: Option<Button>,
    outer: Option<Button>,
    deadzone: f64,
    inner_radius: f64,
    outer_radius: f64,
    has_overlap: bool,
    overlap_ignorance_radius: f64,
}

/// Cross-mapping parameters, all fractions of the full deflection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossSettings {
    pub deadzone: f64,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub has_overlap: bool,
    /// Below this radius diagonals resolve to a single direction
    pub overlap_ignorance_radius: f64,
}

impl Default for CrossSettings {
    fn default() -> Self {
        Self {
            deadzone: 0.2,
            inner_radius: 0.35,
            outer_radius: 0.0,
            has_overlap: true,
            overlap_ignorance_radius: 0.0,
        }
    }
}

impl CrossSettings {
    /// Pads ignore overlap near the centre
    pub fn pad() -> Self {
        Self {
            overlap_ignorance_radius: 0.5,
            ..Self::default()
        }
    }
}

impl ButtonCross {
    pub fn new(
        east: Button,
        north: Button,
        west: Button,
        south: Button,
        settings: CrossSettings,
    ) -> Result<Self, ActuatorError> {
        check_fraction("deadzone", settings.deadzone)?;
        check_fraction("inner_radius", settings.inner_radius)?;
        check_fraction("outer_radius", settings.outer_radius)?;
        check_fraction("overlap_ignorance_radius", settings.overlap_ignorance_radius)?;
        Ok(Self {
            directions: [east, north, west, south],
            inner: None,
            outer: None,
            deadzone: settings.deadzone,
            inner_radius: settings.inner_radius,
            outer_radius: settings.outer_radius,
            has_overlap: settings.has_overlap,
            overlap_ignorance_radius: settings.overlap_ignorance_radius,
        })
    }

    /// Pressed while closer to the centre than `inner_radius`
    pub fn with_inner(mut self, button: Button) -> Self {
        self.inner = Some(button);
        self
    }

    /// Pressed while beyond `1 - outer_radius`
    pub fn with_outer(mut self, button: Button) -> Self {
        self.outer = Some(button);
        self
    }

    /// Cardinal buttons currently held, East, North, West, South
    pub fn pressed(&self) -> [bool; 4] {
        [
            self.directions[0].is_pressed(),
            self.directions[1].is_pressed(),
            self.directions[2].is_pressed(),
            self.directions[3].is_pressed(),
        ]
    }

    /// Press and release buttons for a new position
    pub fn update(&mut self, position: Position) -> Result<(), ActuatorError> {
        let r = position.magnitude();
        if r == 0.0 || r < self.deadzone * AXIS_MAX {
            self.release_buttons()?;
            return Ok(());
        }

        if let Some(inner) = self.inner.as_mut() {
            if r < self.inner_radius * AXIS_MAX {
                inner.press()?;
            } else {
                inner.release()?;
            }
        }
        if let Some(outer) = self.outer.as_mut() {
            if r > (1.0 - self.outer_radius) * AXIS_MAX {
                outer.press()?;
            } else {
                outer.release()?;
            }
        }

        let overlap =
            self.has_overlap && r >= self.overlap_ignorance_radius * AXIS_MAX;
        let arcs = if overlap { &OVERLAP_ARCS } else { &EXCLUSIVE_ARCS };
        let theta = position.angle();

        // Releases first so a direction change never holds both for a moment
        let active: Vec<bool> = arcs.iter().map(|arc| in_arc(theta, *arc)).collect();
        for (button, on) in self.directions.iter_mut().zip(&active) {
            if !on {
                button.release()?;
            }
        }
        for (button, on) in self.directions.iter_mut().zip(&active) {
            if *on {
                button.press()?;
            }
        }
        Ok(())
    }

    fn release_buttons(&mut self) -> Result<(), ActuatorError> {
        for button in self.directions.iter_mut() {
            button.release()?;
        }
        if let Some(inner) = self.inner.as_mut() {
            inner.release()?;
        }
        if let Some(outer) = self.outer.as_mut() {
            outer.release()?;
        }
        Ok(())
    }
}

impl Actuate for ButtonCross {
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        match event {
            InputEvent::Stick { position, .. } => self.update(*position),
            InputEvent::Trackpad { position, .. } => {
                if event.is_release() {
                    self.update(Position::NEUTRAL)
                } else {
                    self.update(*position)
                }
            }
            _ => Err(ActuatorError::shape("button cross", event)),
        }
    }

    fn release_all(&mut self) {
        if let Err(e) = self.release_buttons() {
            warn!("Failed to release cross buttons: {}", e);
        }
        for button in self.directions.iter_mut() {
            button.release_all();
        }
        for button in self.inner.iter_mut().chain(self.outer.iter_mut()) {
            button.release_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::actuators::test_support::context;
    use crate::mapping::actuators::Context;
    use crate::steamcon::types::LogicalInput;

    fn cross(ctx: &Context, settings: CrossSettings) -> ButtonCross {
        ButtonCross::new(
            Button::key(ctx, "d"),
            Button::key(ctx, "w"),
            Button::key(ctx, "a"),
            Button::key(ctx, "s"),
            settings,
        )
        .unwrap()
    }

    fn exclusive() -> CrossSettings {
        CrossSettings {
            has_overlap: false,
            ..CrossSettings::default()
        }
    }

    fn at(radius: f64, pi_units: f64) -> Position {
        let angle = pi_units * std::f64::consts::PI;
        Position::new(
            (radius * AXIS_MAX * angle.cos()).round() as i16,
            (radius * AXIS_MAX * angle.sin()).round() as i16,
        )
    }

    #[test]
    fn test_boundary_at_exactly_45_degrees() {
        let (ctx, mock, _) = context();
        let mut cross = cross(&ctx, exclusive());
        // Equal components: exactly π/4
        let d = (0.9 * AXIS_MAX / std::f64::consts::SQRT_2) as i16;
        cross.update(Position::new(d, d)).unwrap();

        assert_eq!(cross.pressed(), [false, true, false, false]);
        assert_eq!(mock.held_keys(), vec!["w".to_string()]);
    }

    #[test]
    fn test_exclusive_cardinals() {
        let (ctx, _, _) = context();
        let mut cross = cross(&ctx, exclusive());
        let expected = [
            (0.0, [true, false, false, false]),
            (0.5, [false, true, false, false]),
            (1.0, [false, false, true, false]),
            (1.5, [false, false, false, true]),
            (1.9, [true, false, false, false]),
        ];
        for (angle, pressed) in expected {
            cross.update(at(0.8, angle)).unwrap();
            assert_eq!(cross.pressed(), pressed, "angle {}π", angle);
        }
    }

    #[test]
    fn test_overlap_presses_diagonals() {
        let (ctx, mock, _) = context();
        let mut cross = cross(&ctx, CrossSettings::default());
        cross.update(at(0.8, 0.25)).unwrap();
        assert_eq!(cross.pressed(), [true, true, false, false]);
        assert_eq!(mock.held_keys().len(), 2);

        cross.update(at(0.8, 0.5)).unwrap();
        assert_eq!(cross.pressed(), [false, true, false, false]);
    }

    #[test]
    fn test_deadzone_releases_everything() {
        let (ctx, mock, _) = context();
        let mut cross = cross(&ctx, CrossSettings::default());
        cross.update(at(0.8, 0.25)).unwrap();
        cross.update(at(0.1, 0.25)).unwrap();
        assert_eq!(cross.pressed(), [false; 4]);
        assert!(mock.held_keys().is_empty());
    }

    #[test]
    fn test_inner_and_outer_rings() {
        let (ctx, mock, _) = context();
        let settings = CrossSettings {
            outer_radius: 0.1,
            ..exclusive()
        };
        let mut cross = cross(&ctx, settings)
            .with_inner(Button::key(&ctx, "i"))
            .with_outer(Button::key(&ctx, "o"));

        cross.update(at(0.3, 0.0)).unwrap();
        assert!(mock.held_keys().contains(&"i".to_string()));

        cross.update(at(0.95, 0.0)).unwrap();
        let held = mock.held_keys();
        assert!(held.contains(&"o".to_string()));
        assert!(!held.contains(&"i".to_string()));
    }

    #[test]
    fn test_pad_ignores_overlap_near_centre() {
        let (ctx, _, _) = context();
        let mut cross = cross(&ctx, CrossSettings::pad());
        cross.update(at(0.4, 0.3)).unwrap();
        assert_eq!(cross.pressed(), [false, true, false, false]);
        cross.update(at(0.8, 0.3)).unwrap();
        assert_eq!(cross.pressed(), [true, true, false, false]);
    }

    #[test]
    fn test_pad_release_resets() {
        let (ctx, mock, _) = context();
        let mut cross = cross(&ctx, CrossSettings::pad());
        let touch = InputEvent::trackpad_press(LogicalInput::RPadTouch, at(0.9, 1.0));
        cross.do_event(&touch).unwrap();
        assert_eq!(mock.held_keys(), vec!["a".to_string()]);
        cross
            .do_event(&touch.as_release(std::time::Duration::from_millis(30)))
            .unwrap();
        assert!(mock.held_keys().is_empty());
    }

    #[test]
    fn test_rejects_bad_settings() {
        let result = ButtonCross::new(
            Button::none(),
            Button::none(),
            Button::none(),
            Button::none(),
            CrossSettings {
                deadzone: 1.2,
                ..CrossSettings::default()
            },
        );
        assert!(matches!(result, Err(ActuatorError::Config(_))));
    }
}
