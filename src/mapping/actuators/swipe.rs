//! Pad swipe classifier
//!
//! A swipe is the vector from where the finger landed to where it lifted.
//! Swipes longer than the minimum distance tap the button of the slice the
//! vector points into; swipes past the long threshold tap that slice's long
//! button when one is configured. In continuous mode a swipe is also
//! recognized whenever the finger slows below the minimum speed, and the
//! next swipe starts from there.

use crate::mapping::actuators::button::Button;
use crate::mapping::actuators::{check_fraction, Actuate, ActuatorError};
use crate::steamcon::constants::AXIS_FULL_RANGE;
use crate::steamcon::types::{normalized_angle, InputEvent, Position};
use log::{debug, warn};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeSettings {
    /// Fraction of the pad's full range
    pub minimum_distance: f64,
    /// Fraction of the pad's full range; above 1 disables long swipes
    pub long_swipe_threshold: f64,
    /// Start of slice 0, in units of π
    pub angle_offset: f64,
    pub continuous: bool,
    /// Units per millisecond
    pub minimum_speed: f64,
}

impl Default for SwipeSettings {
    fn default() -> Self {
        Self {
            minimum_distance: 0.25,
            long_swipe_threshold: 1.5,
            angle_offset: 0.0,
            continuous: false,
            minimum_speed: 80.0,
        }
    }
}

#[derive(Debug)]
pub struct Swipe {
    buttons: Vec<Button>,
    long_buttons: Vec<Option<Button>>,
    settings: SwipeSettings,
    start: Position,
    previous: Position,
    last_sample: Instant,
    initial: bool,
}

impl Swipe {
    pub fn new(
        buttons: Vec<Button>,
        mut long_buttons: Vec<Option<Button>>,
        settings: SwipeSettings,
    ) -> Result<Self, ActuatorError> {
        check_fraction("minimum_distance", settings.minimum_distance)?;
        if !(settings.long_swipe_threshold >= 0.0) {
            return Err(ActuatorError::Config(
                "long_swipe_threshold must not be negative".into(),
            ));
        }
        if !(settings.minimum_speed >= 0.0) {
            return Err(ActuatorError::Config("minimum_speed must not be negative".into()));
        }
        if long_buttons.len() > buttons.len() {
            return Err(ActuatorError::Config(format!(
                "{} long swipe buttons for {} slices",
                long_buttons.len(),
                buttons.len()
            )));
        }
        long_buttons.resize_with(buttons.len(), || None);
        let settings = SwipeSettings {
            angle_offset: settings.angle_offset.rem_euclid(2.0),
            ..settings
        };
        Ok(Self {
            buttons,
            long_buttons,
            settings,
            start: Position::NEUTRAL,
            previous: Position::NEUTRAL,
            last_sample: Instant::now(),
            initial: true,
        })
    }

    fn begin(&mut self, position: Position) {
        self.start = position;
        self.previous = position;
        self.last_sample = Instant::now();
        self.initial = false;
    }

    /// Classify the stroke from the start to `end`; true if a button fired
    fn trigger(&mut self, end: Position) -> Result<bool, ActuatorError> {
        if self.buttons.is_empty() {
            return Ok(false);
        }
        let dx = end.x as f64 - self.start.x as f64;
        let dy = end.y as f64 - self.start.y as f64;
        let r = dx.hypot(dy);
        if r == 0.0 || r <= self.settings.minimum_distance * AXIS_FULL_RANGE {
            return Ok(false);
        }

        let theta = (normalized_angle(dy, dx) - self.settings.angle_offset).rem_euclid(2.0);
        let width = 2.0 / self.buttons.len() as f64;
        let slice = ((theta / width) as usize).min(self.buttons.len() - 1);
        let is_long = r > self.settings.long_swipe_threshold * AXIS_FULL_RANGE;

        match self.long_buttons[slice].as_mut() {
            Some(long) if is_long => {
                debug!("Long swipe into slice {}", slice);
                long.tap()?;
            }
            _ => {
                debug!("Swipe into slice {}", slice);
                self.buttons[slice].tap()?;
            }
        }
        Ok(true)
    }
}

impl Actuate for Swipe {
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        let InputEvent::Trackpad { position, .. } = event else {
            return Err(ActuatorError::shape("swipe", event));
        };
        let position = *position;

        if self.initial {
            if !event.is_release() {
                self.begin(position);
            }
            return Ok(());
        }
        if event.is_release() {
            self.initial = true;
            self.trigger(position)?;
            return Ok(());
        }
        if self.settings.continuous {
            let now = Instant::now();
            let elapsed = now.duration_since(self.last_sample).as_secs_f64() * 1000.0;
            self.last_sample = now;
            let dx = position.x as f64 - self.previous.x as f64;
            let dy = position.y as f64 - self.previous.y as f64;
            let speed = dx.hypot(dy) / elapsed.max(1.0);
            if speed < self.settings.minimum_speed {
                self.trigger(position)?;
                self.start = position;
            }
            self.previous = position;
        }
        Ok(())
    }

    fn release_all(&mut self) {
        self.initial = true;
        for button in self.buttons.iter_mut() {
            button.release_all();
        }
        for button in self.long_buttons.iter_mut().flatten() {
            button.release_all();
        }
    }

    fn unfreeze(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        // Strokes started before the freeze are discarded
        self.initial = true;
        if event.is_release() {
            warn!("Swipe unfrozen on a release, ignoring stroke");
            return Ok(());
        }
        self.do_event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::OutputCall;
    use crate::mapping::actuators::test_support::{context, keys};
    use crate::mapping::actuators::Context;
    use crate::steamcon::types::LogicalInput;
    use std::time::Duration;

    fn four_way(ctx: &Context, settings: SwipeSettings) -> Swipe {
        let buttons = ["right", "up", "left", "down"]
            .iter()
            .map(|k| Button::key(ctx, k))
            .collect();
        Swipe::new(buttons, vec![], settings).unwrap()
    }

    fn stroke(swipe: &mut Swipe, from: Position, to: Position) {
        let touch = InputEvent::trackpad_press(LogicalInput::RPadTouch, from);
        swipe.do_event(&touch).unwrap();
        let moved = InputEvent::trackpad_press(LogicalInput::RPadTouch, to).as_hold();
        swipe.do_event(&moved).unwrap();
        swipe.do_event(&moved.as_release(Duration::from_millis(100))).unwrap();
    }

    #[test]
    fn test_swipe_up_taps_up() {
        let (ctx, mock, _) = context();
        let mut swipe = four_way(&ctx, SwipeSettings {
            angle_offset: -0.25,
            ..SwipeSettings::default()
        });
        stroke(&mut swipe, Position::new(0, -15000), Position::new(0, 15000));
        assert_eq!(
            mock.calls(),
            vec![OutputCall::Press(keys("up")), OutputCall::Release(keys("up"))]
        );
    }

    #[test]
    fn test_short_swipe_is_ignored() {
        let (ctx, mock, _) = context();
        let mut swipe = four_way(&ctx, SwipeSettings::default());
        stroke(&mut swipe, Position::new(0, 0), Position::new(10000, 0));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_long_swipe_button() {
        let (ctx, mock, _) = context();
        let mut swipe = Swipe::new(
            vec![Button::key(&ctx, "near"), Button::key(&ctx, "back")],
            vec![Some(Button::key(&ctx, "far"))],
            SwipeSettings {
                angle_offset: -0.5,
                long_swipe_threshold: 0.6,
                ..SwipeSettings::default()
            },
        )
        .unwrap();

        stroke(&mut swipe, Position::new(-30000, 0), Position::new(30000, 0));
        stroke(&mut swipe, Position::new(-10000, 0), Position::new(10000, 0));
        assert_eq!(
            mock.calls(),
            vec![
                OutputCall::Press(keys("far")),
                OutputCall::Release(keys("far")),
                OutputCall::Press(keys("near")),
                OutputCall::Release(keys("near")),
            ]
        );
    }

    #[test]
    fn test_rejects_bad_settings() {
        let result = Swipe::new(vec![], vec![None], SwipeSettings::default());
        assert!(matches!(result, Err(ActuatorError::Config(_))));
        let result = Swipe::new(vec![], vec![], SwipeSettings {
            minimum_distance: -0.1,
            ..SwipeSettings::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_non_pad_events() {
        let (ctx, _, _) = context();
        let mut swipe = four_way(&ctx, SwipeSettings::default());
        let result = swipe.do_event(&InputEvent::stick(Position::new(1, 1)));
        assert!(matches!(result, Err(ActuatorError::InvalidEventShape { .. })));
    }
}
