//! Relative pad gestures
//!
//! The finger drags a virtual stick instead of pointing at it: every sample
//! moves the stick by the finger's delta since the previous one. A full
//! stick push takes `relative_size` of the pad's radius. An anchored stick
//! keeps its centre where the touch began; an unanchored one drags its
//! centre along once the finger travels past full deflection, so reversing
//! direction responds at once. Lifting the finger recentres the stick.

use crate::mapping::actuators::cross::ButtonCross;
use crate::mapping::actuators::{
    check_fraction, check_positive, Actuate, ActuatorError, Context, Side,
};
use crate::steamcon::constants::AXIS_MAX;
use crate::steamcon::types::{InputEvent, Position};
use log::trace;

/// Stick push in polar form, radius in raw pad units
#[derive(Debug, Clone, Copy, PartialEq)]
struct Push {
    r: f64,
    theta: f64,
}

fn to_axis(value: f64) -> i16 {
    value.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

/// Finger travel accumulated into a virtual stick position
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    relative_size: f64,
    anchored: bool,
    travel: (f64, f64),
    previous: Option<Position>,
}

impl Slide {
    pub const DEFAULT_RELATIVE_SIZE: f64 = 0.5;

    pub fn new(relative_size: f64, anchored: bool) -> Result<Self, ActuatorError> {
        check_fraction("relative_size", relative_size)?;
        check_positive("relative_size", relative_size)?;
        Ok(Self {
            relative_size,
            anchored,
            travel: (0.0, 0.0),
            previous: None,
        })
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Pad distance of a full push
    fn limit(&self) -> f64 {
        AXIS_MAX * self.relative_size
    }

    /// Move by the finger's delta. The first sample of a touch only
    /// records where the finger is.
    fn advance(&mut self, position: Position) -> Option<Push> {
        let previous = self.previous.replace(position)?;
        self.travel.0 += f64::from(position.x) - f64::from(previous.x);
        self.travel.1 += f64::from(position.y) - f64::from(previous.y);
        Some(Push {
            r: self.travel.0.hypot(self.travel.1),
            theta: self.travel.1.atan2(self.travel.0),
        })
    }

    /// Cap the push at full deflection, dragging the centre when unanchored
    fn clamp(&mut self, push: Push) -> Push {
        let r = push.r.min(self.limit());
        if !self.anchored {
            self.travel = (r * push.theta.cos(), r * push.theta.sin());
        }
        Push { r, ..push }
    }

    /// Scale a push up to the virtual stick's range
    fn scale(&self, push: Push) -> Position {
        let multiple = 1.0 / self.relative_size;
        Position::new(
            to_axis(push.r * push.theta.cos() * multiple),
            to_axis(push.r * push.theta.sin() * multiple),
        )
    }

    fn reset(&mut self) {
        self.travel = (0.0, 0.0);
        self.previous = None;
    }
}

/// Directional buttons driven by a sliding virtual stick
#[derive(Debug)]
pub struct PadSlideCross {
    slide: Slide,
    cross: ButtonCross,
}

impl PadSlideCross {
    pub fn new(slide: Slide, cross: ButtonCross) -> Self {
        Self { slide, cross }
    }
}

impl Actuate for PadSlideCross {
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        let InputEvent::Trackpad { position, .. } = event else {
            return Err(ActuatorError::shape("pad slide cross", event));
        };
        if event.is_release() {
            self.slide.reset();
            return self.cross.update(Position::NEUTRAL);
        }
        if let Some(push) = self.slide.advance(*position) {
            let push = self.slide.clamp(push);
            self.cross.update(self.slide.scale(push))?;
        }
        Ok(())
    }

    fn release_all(&mut self) {
        self.slide.reset();
        self.cross.release_all();
    }

    /// Start over from wherever the finger is now
    fn unfreeze(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        self.slide.reset();
        self.do_event(event)
    }
}

/// Virtual stick moved by sliding on a pad
#[derive(Debug)]
pub struct PadSlideStick {
    ctx: Context,
    side: Side,
    slide: Slide,
    deadzone: f64,
}

impl PadSlideStick {
    pub const DEFAULT_DEADZONE: f64 = 0.1;
    /// Unanchored pushes past this share of the limit count as full
    const OUTER_LIMIT: f64 = 0.9;

    pub fn new(
        ctx: &Context,
        side: Side,
        slide: Slide,
        deadzone: f64,
    ) -> Result<Self, ActuatorError> {
        check_fraction("deadzone", deadzone)?;
        Ok(Self {
            ctx: ctx.clone(),
            side,
            slide,
            deadzone,
        })
    }

    fn centre(&self) {
        self.ctx.set_stick(self.side, 0, 0);
    }
}

impl Actuate for PadSlideStick {
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        let InputEvent::Trackpad { position, .. } = event else {
            return Err(ActuatorError::shape("pad slide stick", event));
        };
        if event.is_release() {
            self.slide.reset();
            self.centre();
            return Ok(());
        }
        let Some(push) = self.slide.advance(*position) else {
            return Ok(());
        };
        if push.r < self.deadzone * AXIS_MAX {
            self.centre();
            return Ok(());
        }

        let mut push = self.slide.clamp(push);
        if !self.slide.is_anchored() {
            let limit = self.slide.limit();
            push.r = if push.r >= Self::OUTER_LIMIT * limit {
                limit
            } else {
                push.r / Self::OUTER_LIMIT
            };
        }
        let stick = self.slide.scale(push);
        trace!("Slide stick {:?} -> ({}, {})", self.side, stick.x, stick.y);
        self.ctx.set_stick(self.side, stick.x, stick.y);
        Ok(())
    }

    fn release_all(&mut self) {
        self.slide.reset();
        self.centre();
    }

    fn unfreeze(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        self.slide.reset();
        self.do_event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::OutputCall;
    use crate::mapping::actuators::button::Button;
    use crate::mapping::actuators::cross::CrossSettings;
    use crate::mapping::actuators::test_support::{context, keys};
    use crate::steamcon::types::LogicalInput;
    use std::time::Duration;

    fn touch(x: i16, y: i16) -> InputEvent {
        InputEvent::trackpad_press(LogicalInput::LPadTouch, Position::new(x, y))
    }

    fn slide_to(actuator: &mut dyn Actuate, x: i16, y: i16) {
        actuator.do_event(&touch(x, y).as_hold()).unwrap();
    }

    fn slide_cross(ctx: &Context, anchored: bool) -> PadSlideCross {
        let cross = ButtonCross::new(
            Button::key(ctx, "d"),
            Button::key(ctx, "w"),
            Button::key(ctx, "a"),
            Button::key(ctx, "s"),
            CrossSettings::pad(),
        )
        .unwrap();
        PadSlideCross::new(Slide::new(0.5, anchored).unwrap(), cross)
    }

    #[test]
    fn test_touch_down_does_not_push() {
        let (ctx, mock, _) = context();
        let mut cross = slide_cross(&ctx, true);
        cross.do_event(&touch(0, 30000)).unwrap();
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_anchored_cross_keeps_centre() {
        let (ctx, mock, _) = context();
        let mut cross = slide_cross(&ctx, true);
        cross.do_event(&touch(0, 0)).unwrap();
        slide_to(&mut cross, 0, 10000);
        assert_eq!(mock.held_keys(), keys("w"));

        // Past full deflection and back: the centre never moved
        slide_to(&mut cross, 0, 30000);
        slide_to(&mut cross, 0, 14000);
        assert_eq!(mock.held_keys(), keys("w"));

        slide_to(&mut cross, 0, -5000);
        assert_eq!(mock.held_keys(), keys("s"));
    }

    #[test]
    fn test_unanchored_cross_drags_centre() {
        let (ctx, mock, _) = context();
        let mut cross = slide_cross(&ctx, false);
        cross.do_event(&touch(0, 0)).unwrap();
        slide_to(&mut cross, 0, 30000);
        assert_eq!(mock.held_keys(), keys("w"));

        // The centre followed the finger, so this is close to it
        slide_to(&mut cross, 0, 14000);
        assert!(mock.held_keys().is_empty());
    }

    #[test]
    fn test_cross_release_recentres() {
        let (ctx, mock, _) = context();
        let mut cross = slide_cross(&ctx, true);
        let down = touch(0, 0);
        cross.do_event(&down).unwrap();
        slide_to(&mut cross, 20000, 0);
        assert_eq!(mock.held_keys(), keys("d"));

        cross
            .do_event(&touch(20000, 0).as_release(Duration::from_millis(300)))
            .unwrap();
        assert!(mock.held_keys().is_empty());

        // A new touch starts from the centre again
        cross.do_event(&touch(20000, 0)).unwrap();
        assert!(mock.held_keys().is_empty());
    }

    #[test]
    fn test_anchored_stick_saturates() {
        let (ctx, mock, _) = context();
        let mut stick =
            PadSlideStick::new(&ctx, Side::Right, Slide::new(0.5, true).unwrap(), 0.1).unwrap();
        stick.do_event(&touch(0, 0)).unwrap();
        slide_to(&mut stick, 10000, 0);
        slide_to(&mut stick, 30000, 0);
        slide_to(&mut stick, 20000, 0);
        stick
            .do_event(&touch(20000, 0).as_release(Duration::from_millis(500)))
            .unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                OutputCall::RightStick(20000, 0),
                OutputCall::RightStick(i16::MAX, 0),
                OutputCall::RightStick(i16::MAX, 0),
                OutputCall::RightStick(0, 0),
            ]
        );
    }

    #[test]
    fn test_unanchored_stick_backs_off_at_once() {
        let (ctx, mock, _) = context();
        let mut stick =
            PadSlideStick::new(&ctx, Side::Left, Slide::new(0.5, false).unwrap(), 0.1).unwrap();
        stick.do_event(&touch(0, 0)).unwrap();
        slide_to(&mut stick, 30000, 0);
        slide_to(&mut stick, 20000, 0);

        let calls = mock.calls();
        assert_eq!(calls[0], OutputCall::LeftStick(i16::MAX, 0));
        assert!(matches!(calls[1], OutputCall::LeftStick(x, 0) if x > 0 && x < 20000));
    }

    #[test]
    fn test_stick_deadzone_centres() {
        let (ctx, mock, _) = context();
        let mut stick =
            PadSlideStick::new(&ctx, Side::Left, Slide::new(0.5, true).unwrap(), 0.1).unwrap();
        stick.do_event(&touch(0, 0)).unwrap();
        slide_to(&mut stick, 1000, 0);
        assert_eq!(mock.calls(), vec![OutputCall::LeftStick(0, 0)]);
    }

    #[test]
    fn test_rejects_bad_relative_size() {
        assert!(Slide::new(1.5, true).is_err());
        assert!(Slide::new(0.0, false).is_err());
        assert!(Slide::new(1.0, false).is_ok());
    }
}
