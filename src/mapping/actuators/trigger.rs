//! Analog trigger actuators

use crate::mapping::actuators::button::Button;
use crate::mapping::actuators::{check_fraction, Actuate, ActuatorError, Context, Side};
use crate::steamcon::constants::TRIGGER_SOFT_RANGE;
use crate::steamcon::types::InputEvent;

/// Stretch the soft range (before the click switch) over the full byte
pub fn scale_pull(pull: u8, include_switch_in_range: bool) -> u8 {
    if include_switch_in_range {
        return pull;
    }
    (pull as f64 / TRIGGER_SOFT_RANGE as f64 * 255.0).clamp(0.0, 255.0) as u8
}

fn pull_of(event: &InputEvent, actuator: &'static str) -> Result<u8, ActuatorError> {
    match event {
        InputEvent::Trigger { pull, .. } => Ok(*pull),
        _ => Err(ActuatorError::shape(actuator, event)),
    }
}

/// Presses a button while the trigger is pulled past a threshold
#[derive(Debug)]
pub struct TriggerButton {
    button: Button,
    /// Fraction of the full pull
    pull_threshold: f64,
    include_switch_in_range: bool,
}

impl TriggerButton {
    pub const DEFAULT_THRESHOLD: f64 = 0.5;

    pub fn new(
        button: Button,
        pull_threshold: f64,
        include_switch_in_range: bool,
    ) -> Result<Self, ActuatorError> {
        check_fraction("pull_threshold", pull_threshold)?;
        Ok(Self {
            button,
            pull_threshold,
            include_switch_in_range,
        })
    }
}

impl Actuate for TriggerButton {
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        let pull = scale_pull(pull_of(event, "trigger button")?, self.include_switch_in_range);
        if pull as f64 > self.pull_threshold * 255.0 {
            self.button.press()
        } else {
            self.button.release()
        }
    }

    fn release_all(&mut self) {
        self.button.release_all();
    }
}

/// Passes the trigger through to a virtual trigger
#[derive(Debug)]
pub struct TriggerAxis {
    ctx: Context,
    side: Side,
    include_switch_in_range: bool,
}

impl TriggerAxis {
    pub fn new(ctx: &Context, side: Side, include_switch_in_range: bool) -> Self {
        Self {
            ctx: ctx.clone(),
            side,
            include_switch_in_range,
        }
    }
}

impl Actuate for TriggerAxis {
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        let pull = scale_pull(pull_of(event, "trigger axis")?, self.include_switch_in_range);
        self.ctx.pull_trigger(self.side, pull);
        Ok(())
    }

    fn release_all(&mut self) {
        self.ctx.pull_trigger(self.side, 0);
    }
}
