//! Stick-shaped actuators: virtual stick passthrough and wheel scrolling

use crate::mapping::actuators::filters::FractionalCarry;
use crate::mapping::actuators::{check_fraction, check_positive, Actuate, ActuatorError, Context, Side};
use crate::steamcon::constants::AXIS_MAX;
use crate::steamcon::types::{InputEvent, Position};
use log::trace;
use std::f64::consts::PI;

/// Forwards the physical position to a virtual stick
#[derive(Debug)]
pub struct StickAxis {
    ctx: Context,
    side: Side,
    deadzone: f64,
}

impl StickAxis {
    pub const DEFAULT_DEADZONE: f64 = 0.2;

    pub fn new(ctx: &Context, side: Side, deadzone: f64) -> Result<Self, ActuatorError> {
        check_fraction("deadzone", deadzone)?;
        Ok(Self {
            ctx: ctx.clone(),
            side,
            deadzone,
        })
    }

    pub fn update(&mut self, position: Position) {
        if position.magnitude() / AXIS_MAX < self.deadzone {
            self.ctx.set_stick(self.side, 0, 0);
        } else {
            self.ctx.set_stick(self.side, position.x, position.y);
        }
    }
}

impl Actuate for StickAxis {
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        match event.position() {
            Some(position) => {
                self.update(position);
                Ok(())
            }
            None => Err(ActuatorError::shape("stick axis", event)),
        }
    }

    fn release_all(&mut self) {
        self.ctx.set_stick(self.side, 0, 0);
    }
}

/// Scrolls proportionally to the stick deflection
#[derive(Debug)]
pub struct StickScroll {
    ctx: Context,
    /// Wheel clicks per event at full deflection
    sensitivity: f64,
    deadzone: f64,
    reversed: bool,
    along_x: bool,
    carry: FractionalCarry,
}

impl StickScroll {
    pub const DEFAULT_SENSITIVITY: f64 = 0.8;
    pub const DEFAULT_DEADZONE: f64 = 0.2;

    pub fn new(
        ctx: &Context,
        sensitivity: f64,
        deadzone: f64,
        reversed: bool,
        along_x: bool,
    ) -> Result<Self, ActuatorError> {
        check_positive("sensitivity", sensitivity)?;
        check_fraction("deadzone", deadzone)?;
        Ok(Self {
            ctx: ctx.clone(),
            sensitivity,
            deadzone,
            reversed,
            along_x,
            carry: FractionalCarry::default(),
        })
    }
}

impl Actuate for StickScroll {
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        let InputEvent::Stick { position, .. } = event else {
            return Err(ActuatorError::shape("stick scroll", event));
        };
        if position.magnitude() < self.deadzone * AXIS_MAX {
            self.carry.reset();
            return Ok(());
        }
        let coord = if self.along_x { position.x } else { position.y };
        let mut amount = coord as f64 / AXIS_MAX * self.sensitivity;
        if self.reversed {
            amount = -amount;
        }
        let clicks = self.carry.take_one(amount);
        self.ctx.scroll(clicks, true);
        Ok(())
    }

    fn release_all(&mut self) {
        self.carry.reset();
    }
}

/// Pad as a virtual stick; lifting the finger centres the stick
#[derive(Debug)]
pub struct PadStick {
    stick: StickAxis,
}

impl PadStick {
    pub fn new(stick: StickAxis) -> Self {
        Self { stick }
    }
}

impl Actuate for PadStick {
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        let InputEvent::Trackpad { position, .. } = event else {
            return Err(ActuatorError::shape("pad stick", event));
        };
        self.stick.update(*position);
        if event.is_release() {
            self.stick.update(Position::NEUTRAL);
        }
        Ok(())
    }

    fn release_all(&mut self) {
        self.stick.release_all();
    }
}

/// Pad as a scroll wheel, either by circling the finger or by swiping
#[derive(Debug)]
pub struct PadScroll {
    ctx: Context,
    /// Circular motion when true, linear swipes otherwise
    wheel_else_swipe: bool,
    sensitivity: f64,
    reversed: bool,
    along_x: bool,
    previous: Option<Position>,
    /// Radians, `None` when the finger sat on the exact centre
    previous_theta: Option<f64>,
    carry: FractionalCarry,
}

/// Polar angle in `[0, 2π)`, `None` at the origin
fn theta_of(position: Position) -> Option<f64> {
    if position.is_neutral() {
        return None;
    }
    Some((position.y as f64).atan2(position.x as f64).rem_euclid(2.0 * PI))
}

impl PadScroll {
    pub const DEFAULT_SENSITIVITY: f64 = 5.0;

    pub fn new(
        ctx: &Context,
        wheel_else_swipe: bool,
        sensitivity: f64,
        reversed: bool,
        along_x: bool,
    ) -> Result<Self, ActuatorError> {
        check_positive("sensitivity", sensitivity)?;
        Ok(Self {
            ctx: ctx.clone(),
            wheel_else_swipe,
            sensitivity,
            reversed,
            along_x,
            previous: None,
            previous_theta: None,
            carry: FractionalCarry::default(),
        })
    }

    fn reset(&mut self) {
        self.previous = None;
        self.previous_theta = None;
        self.carry.reset();
    }

    /// Signed rotation from the previous sample, wrapping across 0
    fn wheel_delta(&self, theta: Option<f64>) -> f64 {
        let (Some(theta), Some(previous)) = (theta, self.previous_theta) else {
            return 0.0;
        };
        let mut delta = theta - previous;
        if delta > PI {
            delta -= 2.0 * PI;
        } else if delta < -PI {
            delta += 2.0 * PI;
        }
        delta
    }

    fn swipe_delta(&self, position: Position, previous: Position) -> f64 {
        let (now, before) = if self.along_x {
            (position.x, previous.x)
        } else {
            (position.y, previous.y)
        };
        (now as f64 - before as f64) / AXIS_MAX
    }
}

impl Actuate for PadScroll {
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        let InputEvent::Trackpad { position, .. } = event else {
            return Err(ActuatorError::shape("pad scroll", event));
        };
        let position = *position;

        let Some(previous) = self.previous else {
            if !event.is_release() {
                self.previous = Some(position);
                self.previous_theta = theta_of(position);
            }
            return Ok(());
        };

        let mut delta = if self.wheel_else_swipe {
            let theta = theta_of(position);
            let delta = self.wheel_delta(theta);
            self.previous_theta = theta;
            delta
        } else {
            self.swipe_delta(position, previous)
        };
        if self.reversed {
            delta = -delta;
        }
        let clicks = self.carry.take_one(delta * self.sensitivity);
        trace!("Pad scroll {:.3} -> {} clicks", delta, clicks);
        self.ctx.scroll(clicks, true);
        self.previous = Some(position);

        if event.is_release() {
            self.reset();
        }
        Ok(())
    }

    fn release_all(&mut self) {
        self.reset();
    }

    fn unfreeze(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        self.reset();
        self.do_event(event)
    }
}
