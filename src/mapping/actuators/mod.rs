//! Gesture engines ("actuators")
//!
//! Every binding in an action map owns one actuator. Actuators receive the
//! events routed to them, keep whatever gesture state they need, and drive
//! the output backend through their [`Context`]. Layer changes they request
//! are queued as [`SideEffect`]s and applied by the router.

pub mod button;
pub mod cross;
pub mod filters;
pub mod gyro;
pub mod macros;
pub mod pad;
pub mod radial;
pub mod slide;
pub mod stick;
pub mod swipe;
pub mod task;
pub mod trackball;
pub mod trigger;

pub use button::{Button, ButtonKind};
pub use cross::ButtonCross;
pub use gyro::GyroMouse;
pub use macros::MacroStep;
pub use pad::{PadGesture, Trackpad};
pub use radial::Radial;
pub use slide::{PadSlideCross, PadSlideStick, Slide};
pub use stick::{PadScroll, PadStick, StickAxis, StickScroll};
pub use swipe::Swipe;
pub use trackball::Trackball;
pub use trigger::{TriggerAxis, TriggerButton};

use crate::backend::OutputBackend;
use crate::steamcon::types::InputEvent;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("{actuator} cannot handle {event} events")]
    InvalidEventShape {
        actuator: &'static str,
        event: &'static str,
    },

    #[error("Invalid actuator configuration: {0}")]
    Config(String),

    #[error("Failed to spawn background task: {0}")]
    Spawn(#[from] std::io::Error),
}

impl ActuatorError {
    pub(crate) fn shape(actuator: &'static str, event: &InputEvent) -> Self {
        ActuatorError::InvalidEventShape {
            actuator,
            event: event.kind(),
        }
    }
}

/// Reject a parameter outside `[0, 1]`
pub(crate) fn check_fraction(name: &str, value: f64) -> Result<(), ActuatorError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ActuatorError::Config(format!(
            "{} must be between 0.0 and 1.0 (got {})",
            name, value
        )));
    }
    Ok(())
}

/// Reject a parameter that is not strictly positive
pub(crate) fn check_positive(name: &str, value: f64) -> Result<(), ActuatorError> {
    if !(value > 0.0) {
        return Err(ActuatorError::Config(format!(
            "{} must be positive (got {})",
            name, value
        )));
    }
    Ok(())
}

/// Virtual stick or trigger targeted by an axis actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// Layer change requested by an actuator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    EnterLayer { name: String, transparent: bool },
    ExitLayer { name: String },
}

/// Everything an actuator needs from the outside world
#[derive(Clone)]
pub struct Context {
    output: Arc<dyn OutputBackend>,
    effects: Sender<SideEffect>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}

impl Context {
    /// Create a context and the receiving end of its side-effect queue
    pub fn new(output: Arc<dyn OutputBackend>) -> (Self, Receiver<SideEffect>) {
        let (effects, receiver) = unbounded();
        (Self { output, effects }, receiver)
    }

    pub fn output(&self) -> &Arc<dyn OutputBackend> {
        &self.output
    }

    pub fn enter_layer(&self, name: &str, transparent: bool) {
        self.send(SideEffect::EnterLayer {
            name: name.to_string(),
            transparent,
        });
    }

    pub fn exit_layer(&self, name: &str) {
        self.send(SideEffect::ExitLayer {
            name: name.to_string(),
        });
    }

    fn send(&self, effect: SideEffect) {
        debug!("Queueing {:?}", effect);
        if self.effects.send(effect).is_err() {
            warn!("Side effect dropped: router is gone");
        }
    }

    pub fn press(&self, keys: &[String]) {
        if let Err(e) = self.output.press(keys) {
            warn!("Failed to press '{}': {}", keys.join("+"), e);
        }
    }

    pub fn release(&self, keys: &[String]) {
        if let Err(e) = self.output.release(keys) {
            warn!("Failed to release '{}': {}", keys.join("+"), e);
        }
    }

    pub fn move_mouse(&self, dx: i32, dy: i32, relative: bool) {
        if dx == 0 && dy == 0 && relative {
            return;
        }
        if let Err(e) = self.output.move_mouse(dx, dy, relative) {
            warn!("Failed to move mouse: {}", e);
        }
    }

    pub fn scroll(&self, amount: i32, as_clicks: bool) {
        if amount == 0 {
            return;
        }
        if let Err(e) = self.output.scroll(amount, as_clicks) {
            warn!("Failed to scroll: {}", e);
        }
    }

    pub fn pull_trigger(&self, side: Side, amount: u8) {
        let result = match side {
            Side::Left => self.output.pull_left_trigger(amount),
            Side::Right => self.output.pull_right_trigger(amount),
        };
        if let Err(e) = result {
            warn!("Failed to pull {:?} trigger: {}", side, e);
        }
    }

    pub fn set_stick(&self, side: Side, x: i16, y: i16) {
        let result = match side {
            Side::Left => self.output.set_left_stick(x, y),
            Side::Right => self.output.set_right_stick(x, y),
        };
        if let Err(e) = result {
            warn!("Failed to move {:?} stick: {}", side, e);
        }
    }
}

/// Capability shared by every gesture engine
pub trait Actuate {
    /// Handle one routed event
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError>;

    /// Release every output this actuator may be holding and stop its tasks
    fn release_all(&mut self);

    /// First event after the owning layer stops being frozen
    fn unfreeze(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        self.do_event(event)
    }
}

/// Closed set of actuators a binding can hold
#[derive(Debug)]
pub enum Actuator {
    Button(Button),
    TriggerButton(TriggerButton),
    TriggerAxis(TriggerAxis),
    StickCross(ButtonCross),
    StickRadial(Radial),
    StickAxis(StickAxis),
    StickScroll(StickScroll),
    Pad(Trackpad),
    Gyro(GyroMouse),
}

impl Actuator {
    pub fn name(&self) -> &'static str {
        match self {
            Actuator::Button(_) => "button",
            Actuator::TriggerButton(_) => "trigger button",
            Actuator::TriggerAxis(_) => "trigger axis",
            Actuator::StickCross(_) => "stick cross",
            Actuator::StickRadial(_) => "stick radial",
            Actuator::StickAxis(_) => "stick axis",
            Actuator::StickScroll(_) => "stick scroll",
            Actuator::Pad(pad) => pad.name(),
            Actuator::Gyro(_) => "gyro mouse",
        }
    }

    fn as_actuate(&mut self) -> &mut dyn Actuate {
        match self {
            Actuator::Button(a) => a,
            Actuator::TriggerButton(a) => a,
            Actuator::TriggerAxis(a) => a,
            Actuator::StickCross(a) => a,
            Actuator::StickRadial(a) => a,
            Actuator::StickAxis(a) => a,
            Actuator::StickScroll(a) => a,
            Actuator::Pad(a) => a,
            Actuator::Gyro(a) => a,
        }
    }
}

impl Actuate for Actuator {
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        self.as_actuate().do_event(event)
    }

    fn release_all(&mut self) {
        self.as_actuate().release_all()
    }

    fn unfreeze(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        self.as_actuate().unfreeze(event)
    }
}
