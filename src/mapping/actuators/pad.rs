//! Trackpad binding: one pad gesture plus an optional double-tap button
//!
//! A tap is a touch shorter than the tap window. A second touch that starts
//! within the window after a tap is a double tap: it taps the double-tap
//! button on lift-off, or holds it for the length of the touch when
//! `double_tap_held` is set. The gesture sees every event either way.

use crate::mapping::actuators::button::Button;
use crate::mapping::actuators::cross::ButtonCross;
use crate::mapping::actuators::radial::Radial;
use crate::mapping::actuators::slide::{PadSlideCross, PadSlideStick};
use crate::mapping::actuators::stick::{PadScroll, PadStick};
use crate::mapping::actuators::swipe::Swipe;
use crate::mapping::actuators::trackball::Trackball;
use crate::mapping::actuators::{Actuate, ActuatorError};
use crate::steamcon::types::InputEvent;
use log::debug;
use std::time::{Duration, Instant};

/// Gesture engines a pad can drive
#[derive(Debug)]
pub enum PadGesture {
    Cross(ButtonCross),
    Radial(Radial),
    Swipe(Swipe),
    Trackball(Trackball),
    Stick(PadStick),
    Scroll(PadScroll),
    SlideCross(PadSlideCross),
    SlideStick(PadSlideStick),
}

impl PadGesture {
    fn as_actuate(&mut self) -> &mut dyn Actuate {
        match self {
            PadGesture::Cross(g) => g,
            PadGesture::Radial(g) => g,
            PadGesture::Swipe(g) => g,
            PadGesture::Trackball(g) => g,
            PadGesture::Stick(g) => g,
            PadGesture::Scroll(g) => g,
            PadGesture::SlideCross(g) => g,
            PadGesture::SlideStick(g) => g,
        }
    }
}

#[derive(Debug)]
pub struct Trackpad {
    gesture: PadGesture,
    double_tap: Option<Button>,
    double_tap_held: bool,
    window: Duration,
    armed_at: Option<Instant>,
    second_tap_active: bool,
}

impl Trackpad {
    pub const TAP_WINDOW: Duration = Duration::from_millis(250);

    pub fn new(gesture: PadGesture) -> Self {
        Self {
            gesture,
            double_tap: None,
            double_tap_held: false,
            window: Self::TAP_WINDOW,
            armed_at: None,
            second_tap_active: false,
        }
    }

    pub fn with_double_tap(mut self, button: Button, held: bool) -> Self {
        self.double_tap = Some(button);
        self.double_tap_held = held;
        self
    }

    pub fn gesture(&self) -> &PadGesture {
        &self.gesture
    }

    pub fn name(&self) -> &'static str {
        match self.gesture {
            PadGesture::Cross(_) => "pad cross",
            PadGesture::Radial(_) => "pad radial",
            PadGesture::Swipe(_) => "pad swipe",
            PadGesture::Trackball(_) => "pad trackball",
            PadGesture::Stick(_) => "pad stick",
            PadGesture::Scroll(_) => "pad scroll",
            PadGesture::SlideCross(_) => "pad slide cross",
            PadGesture::SlideStick(_) => "pad slide stick",
        }
    }

    fn track_taps(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        let Some(button) = self.double_tap.as_mut() else {
            return Ok(());
        };
        let now = Instant::now();

        if event.is_press() {
            let armed = self
                .armed_at
                .take()
                .map_or(false, |at| now.duration_since(at) < self.window);
            if armed {
                debug!("Double tap on {:?}", event.input());
                self.second_tap_active = true;
                if self.double_tap_held {
                    button.press()?;
                }
            }
        } else if event.is_release() {
            let was_tap = event.time_held().map_or(false, |held| held < self.window);
            if self.second_tap_active {
                self.second_tap_active = false;
                if self.double_tap_held {
                    button.release()?;
                } else if was_tap {
                    button.tap()?;
                }
            } else if was_tap {
                self.armed_at = Some(now);
            }
        }
        Ok(())
    }
}

impl Actuate for Trackpad {
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        if !matches!(event, InputEvent::Trackpad { .. }) {
            return Err(ActuatorError::shape(self.name(), event));
        }
        self.track_taps(event)?;
        self.gesture.as_actuate().do_event(event)
    }

    fn release_all(&mut self) {
        self.armed_at = None;
        self.second_tap_active = false;
        if let Some(button) = self.double_tap.as_mut() {
            button.release_all();
        }
        self.gesture.as_actuate().release_all();
    }

    fn unfreeze(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        self.armed_at = None;
        self.gesture.as_actuate().unfreeze(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::OutputCall;
    use crate::mapping::actuators::cross::CrossSettings;
    use crate::mapping::actuators::test_support::{context, keys};
    use crate::mapping::actuators::Context;
    use crate::steamcon::types::{LogicalInput, Position};

    fn empty_cross() -> PadGesture {
        PadGesture::Cross(
            ButtonCross::new(
                Button::none(),
                Button::none(),
                Button::none(),
                Button::none(),
                CrossSettings::pad(),
            )
            .unwrap(),
        )
    }

    fn double_tap_pad(ctx: &Context, held: bool) -> Trackpad {
        Trackpad::new(empty_cross()).with_double_tap(Button::key(ctx, "enter"), held)
    }

    fn tap(pad: &mut Trackpad, held_for: Duration) {
        let touch = InputEvent::trackpad_press(LogicalInput::RPadTouch, Position::new(0, 0));
        pad.do_event(&touch).unwrap();
        pad.do_event(&touch.as_release(held_for)).unwrap();
    }

    #[test]
    fn test_double_tap_taps_button() {
        let (ctx, mock, _) = context();
        let mut pad = double_tap_pad(&ctx, false);
        tap(&mut pad, Duration::from_millis(60));
        assert!(mock.calls().is_empty());
        tap(&mut pad, Duration::from_millis(60));
        assert_eq!(
            mock.calls(),
            vec![OutputCall::Press(keys("enter")), OutputCall::Release(keys("enter"))]
        );
    }

    #[test]
    fn test_long_touch_does_not_arm() {
        let (ctx, mock, _) = context();
        let mut pad = double_tap_pad(&ctx, false);
        tap(&mut pad, Duration::from_millis(400));
        tap(&mut pad, Duration::from_millis(60));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_held_double_tap_follows_touch() {
        let (ctx, mock, _) = context();
        let mut pad = double_tap_pad(&ctx, true);
        tap(&mut pad, Duration::from_millis(60));

        let touch = InputEvent::trackpad_press(LogicalInput::RPadTouch, Position::new(0, 0));
        pad.do_event(&touch).unwrap();
        pad.do_event(&touch.as_hold()).unwrap();
        assert_eq!(mock.held_keys(), keys("enter"));
        pad.do_event(&touch.as_release(Duration::from_millis(900))).unwrap();
        assert!(mock.held_keys().is_empty());
    }

    #[test]
    fn test_gesture_still_sees_events() {
        let (ctx, mock, _) = context();
        let cross = ButtonCross::new(
            Button::key(&ctx, "d"),
            Button::key(&ctx, "w"),
            Button::key(&ctx, "a"),
            Button::key(&ctx, "s"),
            CrossSettings::pad(),
        )
        .unwrap();
        let mut pad = Trackpad::new(PadGesture::Cross(cross))
            .with_double_tap(Button::key(&ctx, "enter"), false);
        let touch = InputEvent::trackpad_press(LogicalInput::LPadTouch, Position::new(0, 30000));
        pad.do_event(&touch).unwrap();
        assert_eq!(mock.held_keys(), keys("w"));
        pad.release_all();
        assert!(mock.held_keys().is_empty());
        assert_eq!(pad.name(), "pad cross");
    }

    #[test]
    fn test_rejects_non_pad_events() {
        let mut pad = Trackpad::new(empty_cross());
        let result = pad.do_event(&InputEvent::button_press(LogicalInput::A));
        assert!(matches!(
            result,
            Err(ActuatorError::InvalidEventShape { actuator: "pad cross", .. })
        ));
    }
}
