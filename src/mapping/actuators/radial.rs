//! Radial menu: N equal slices around a stick or pad

use crate::mapping::actuators::button::Button;
use crate::mapping::actuators::{check_fraction, Actuate, ActuatorError};
use crate::steamcon::constants::AXIS_MAX;
use crate::steamcon::types::{InputEvent, Position};
use log::{trace, warn};

#[derive(Debug)]
pub struct Radial {
    buttons: Vec<Button>,
    deadzone: f64,
    /// Start of slice 0, in units of π
    angle_offset: f64,
    /// Slices count up counter-clockwise when true
    increments_left: bool,
    /// Tap on entering a slice instead of holding the current one
    taps: bool,
    previous_slice: Option<usize>,
}

impl Radial {
    pub const DEFAULT_DEADZONE: f64 = 0.1;
    /// Pads have no resting offset to filter out
    pub const PAD_DEADZONE: f64 = 0.0;

    pub fn new(
        buttons: Vec<Button>,
        deadzone: f64,
        angle_offset: f64,
        increments_left: bool,
        taps: bool,
    ) -> Result<Self, ActuatorError> {
        check_fraction("deadzone", deadzone)?;
        if !angle_offset.is_finite() {
            return Err(ActuatorError::Config("angle_offset must be finite".into()));
        }
        Ok(Self {
            buttons,
            deadzone,
            angle_offset: angle_offset.rem_euclid(2.0),
            increments_left,
            taps,
            previous_slice: None,
        })
    }

    /// Slice index under `position`
    pub fn slice_of(&self, position: Position) -> Option<usize> {
        let count = self.buttons.len();
        if count == 0 {
            return None;
        }
        let theta = (position.angle() - self.angle_offset).rem_euclid(2.0);
        let width = 2.0 / count as f64;
        let index = ((theta / width) as usize).min(count - 1);
        if self.increments_left {
            Some(index)
        } else {
            Some(count - 1 - index)
        }
    }

    pub fn update(&mut self, position: Position) -> Result<(), ActuatorError> {
        if self.buttons.is_empty() {
            return Ok(());
        }
        if position.magnitude() < self.deadzone * AXIS_MAX {
            self.previous_slice = None;
            self.release_buttons()?;
            return Ok(());
        }
        let Some(slice) = self.slice_of(position) else {
            return Ok(());
        };

        if self.taps {
            if self.previous_slice != Some(slice) {
                trace!("Radial entered slice {}", slice);
                self.buttons[slice].tap()?;
            }
        } else {
            for (index, button) in self.buttons.iter_mut().enumerate() {
                if index != slice {
                    button.release()?;
                }
            }
            self.buttons[slice].press()?;
        }
        self.previous_slice = Some(slice);
        Ok(())
    }

    fn release_buttons(&mut self) -> Result<(), ActuatorError> {
        for button in self.buttons.iter_mut() {
            button.release()?;
        }
        Ok(())
    }
}

impl Actuate for Radial {
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        match event {
            InputEvent::Stick { position, .. } => self.update(*position),
            InputEvent::Trackpad { position, .. } => {
                if event.is_release() {
                    self.previous_slice = None;
                    if !self.taps {
                        self.release_buttons()?;
                    }
                    Ok(())
                } else {
                    self.update(*position)
                }
            }
            _ => Err(ActuatorError::shape("radial", event)),
        }
    }

    fn release_all(&mut self) {
        self.previous_slice = None;
        if let Err(e) = self.release_buttons() {
            warn!("Failed to release radial buttons: {}", e);
        }
        self.buttons.iter_mut().for_each(Button::release_all);
    }
}
