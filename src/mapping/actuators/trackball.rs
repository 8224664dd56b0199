//! Pad trackball
//!
//! Finger movement on the pad moves the mouse. On lift-off the ball keeps
//! rolling with the release speed, decaying every tick until it stops. A new
//! touch stops the ball immediately.

use crate::mapping::actuators::filters::{AccelerationCurve, FractionalCarry, Smoother};
use crate::mapping::actuators::task::Task;
use crate::mapping::actuators::{check_fraction, check_positive, Actuate, ActuatorError, Context};
use crate::steamcon::types::{InputEvent, Position};
use log::{debug, trace};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackballSettings {
    /// Output pixels per raw pad unit
    pub sensitivity: f64,
    pub has_inertia: bool,
    /// Fraction of speed lost per tick
    pub deceleration: f64,
    pub invert_x: bool,
    pub invert_y: bool,
    pub acceleration: AccelerationCurve,
}

impl Default for TrackballSettings {
    fn default() -> Self {
        Self {
            sensitivity: 0.03,
            has_inertia: true,
            deceleration: 0.1,
            invert_x: false,
            invert_y: false,
            acceleration: AccelerationCurve::default(),
        }
    }
}

#[derive(Debug)]
pub struct Trackball {
    ctx: Context,
    settings: TrackballSettings,
    smoother: Smoother,
    carry: FractionalCarry,
    previous: Option<Position>,
    last_sample: Instant,
    /// Raw units per millisecond
    velocity: (f64, f64),
    inertia: Option<Task>,
}

impl Trackball {
    pub const INERTIA_TICK: Duration = Duration::from_millis(10);
    /// Raw units per millisecond below which the ball stops
    pub const INERTIA_CUTOFF: f64 = 5.0;

    pub fn new(ctx: &Context, settings: TrackballSettings) -> Result<Self, ActuatorError> {
        check_positive("sensitivity", settings.sensitivity)?;
        check_fraction("deceleration", settings.deceleration)?;
        check_positive("acceleration factor", settings.acceleration.factor)?;
        if settings.acceleration.lower > settings.acceleration.upper {
            return Err(ActuatorError::Config(
                "acceleration lower boundary exceeds upper boundary".into(),
            ));
        }
        Ok(Self {
            ctx: ctx.clone(),
            settings,
            smoother: Smoother::default(),
            carry: FractionalCarry::default(),
            previous: None,
            last_sample: Instant::now(),
            velocity: (0.0, 0.0),
            inertia: None,
        })
    }

    pub fn is_rolling(&self) -> bool {
        self.inertia.as_ref().map_or(false, |task| !task.is_finished())
    }

    fn stop_rolling(&mut self) {
        if let Some(mut task) = self.inertia.take() {
            task.cancel();
        }
    }

    fn touch(&mut self, position: Position) {
        self.stop_rolling();
        self.previous = Some(position);
        self.smoother.clear();
        self.carry.reset();
        self.velocity = (0.0, 0.0);
        self.last_sample = Instant::now();
    }

    fn orient(&self, delta: (f64, f64)) -> (f64, f64) {
        let x = if self.settings.invert_x { -delta.0 } else { delta.0 };
        // Pad y grows upwards, screen y downwards
        let y = if self.settings.invert_y { delta.1 } else { -delta.1 };
        (x, y)
    }

    fn track(&mut self, position: Position, previous: Position) {
        let now = Instant::now();
        let elapsed_ms = (now.duration_since(self.last_sample).as_secs_f64() * 1000.0).max(1.0);
        self.last_sample = now;

        let raw = (
            position.x as f64 - previous.x as f64,
            position.y as f64 - previous.y as f64,
        );
        let smoothed = self.smoother.soft_tiered(raw);
        let scaled = self.settings.acceleration.apply(smoothed, self.settings.sensitivity);
        let (dx, dy) = self.carry.take(self.orient(scaled));
        self.ctx.move_mouse(dx, dy, true);

        self.velocity = (smoothed.0 / elapsed_ms, smoothed.1 / elapsed_ms);
        self.previous = Some(position);
    }

    fn roll(&mut self) -> Result<(), ActuatorError> {
        let speed = self.velocity.0.hypot(self.velocity.1);
        if !self.settings.has_inertia || speed <= Self::INERTIA_CUTOFF {
            return Ok(());
        }
        debug!("Trackball rolling at {:.1} units/ms", speed);
        let ctx = self.ctx.clone();
        let mut velocity = self.orient(self.velocity);
        let sensitivity = self.settings.sensitivity;
        let keep = 1.0 - self.settings.deceleration;
        let tick_ms = Self::INERTIA_TICK.as_secs_f64() * 1000.0;

        self.inertia = Some(Task::spawn("trackball-inertia", move |token| {
            let mut carry = FractionalCarry::default();
            while token.sleep(Self::INERTIA_TICK) {
                velocity = (velocity.0 * keep, velocity.1 * keep);
                if velocity.0.hypot(velocity.1) <= Self::INERTIA_CUTOFF {
                    break;
                }
                let (dx, dy) = carry.take((
                    velocity.0 * tick_ms * sensitivity,
                    velocity.1 * tick_ms * sensitivity,
                ));
                ctx.move_mouse(dx, dy, true);
            }
            trace!("Trackball stopped");
        })?);
        Ok(())
    }
}

impl Actuate for Trackball {
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        let InputEvent::Trackpad { position, .. } = event else {
            return Err(ActuatorError::shape("trackball", event));
        };
        let position = *position;

        let Some(previous) = self.previous else {
            if !event.is_release() {
                self.touch(position);
            }
            return Ok(());
        };
        self.track(position, previous);

        if event.is_release() {
            self.previous = None;
            self.carry.reset();
            self.roll()?;
        }
        Ok(())
    }

    fn release_all(&mut self) {
        self.stop_rolling();
        self.previous = None;
    }

    fn unfreeze(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        // Re-prime so the jump since the freeze is not replayed
        match event {
            InputEvent::Trackpad { position, .. } if !event.is_release() => {
                self.touch(*position);
                Ok(())
            }
            InputEvent::Trackpad { .. } => {
                self.release_all();
                Ok(())
            }
            _ => Err(ActuatorError::shape("trackball", event)),
        }
    }
}
