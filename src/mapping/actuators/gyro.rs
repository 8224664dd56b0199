//! Gyro-to-mouse
//!
//! Each motion sample carries the controller's absolute orientation. The
//! rotation between two consecutive samples is `current * previous⁻¹`; its
//! yaw (or roll) moves the pointer horizontally and its pitch vertically.

use crate::mapping::actuators::filters::FractionalCarry;
use crate::mapping::actuators::{check_positive, Actuate, ActuatorError, Context};
use crate::steamcon::types::{InputEvent, Orientation};
use log::trace;
use nalgebra::{Quaternion, UnitQuaternion};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GyroSettings {
    /// Pixels per radian of rotation
    pub sensitivity: f64,
    /// Horizontal movement follows yaw when true, roll otherwise
    pub yaw_else_roll: bool,
    pub invert_x: bool,
    pub invert_y: bool,
}

impl Default for GyroSettings {
    fn default() -> Self {
        Self {
            sensitivity: 1000.0,
            yaw_else_roll: true,
            invert_x: false,
            invert_y: false,
        }
    }
}

#[derive(Debug)]
pub struct GyroMouse {
    ctx: Context,
    settings: GyroSettings,
    previous: Option<UnitQuaternion<f64>>,
    carry: FractionalCarry,
}

/// Normalized orientation, `None` before the IMU reports anything
pub fn to_unit_quaternion(orientation: &Orientation) -> Option<UnitQuaternion<f64>> {
    let scale = i16::MAX as f64;
    let q = Quaternion::new(
        orientation.w as f64 / scale,
        orientation.x as f64 / scale,
        orientation.y as f64 / scale,
        orientation.z as f64 / scale,
    );
    if q.norm() < f64::EPSILON {
        return None;
    }
    Some(UnitQuaternion::from_quaternion(q))
}

impl GyroMouse {
    pub fn new(ctx: &Context, settings: GyroSettings) -> Result<Self, ActuatorError> {
        check_positive("sensitivity", settings.sensitivity)?;
        Ok(Self {
            ctx: ctx.clone(),
            settings,
            previous: None,
            carry: FractionalCarry::default(),
        })
    }

    fn orientation_of(event: &InputEvent) -> Result<Option<UnitQuaternion<f64>>, ActuatorError> {
        match event {
            InputEvent::Motion { orientation, .. } => Ok(to_unit_quaternion(orientation)),
            _ => Err(ActuatorError::shape("gyro mouse", event)),
        }
    }
}

impl Actuate for GyroMouse {
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        let Some(current) = Self::orientation_of(event)? else {
            return Ok(());
        };
        if let Some(previous) = self.previous {
            let delta = current * previous.inverse();
            let (roll, pitch, yaw) = delta.euler_angles();
            let horizontal = if self.settings.yaw_else_roll { yaw } else { roll };

            let mut x = horizontal * self.settings.sensitivity;
            let mut y = pitch * self.settings.sensitivity;
            if self.settings.invert_x {
                x = -x;
            }
            if self.settings.invert_y {
                y = -y;
            }
            let (dx, dy) = self.carry.take((x, y));
            trace!("Gyro delta roll={:.4} pitch={:.4} yaw={:.4}", roll, pitch, yaw);
            self.ctx.move_mouse(dx, dy, true);
        }
        self.previous = Some(current);
        Ok(())
    }

    fn release_all(&mut self) {
        self.carry.reset();
    }

    fn unfreeze(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        // Rotation while frozen is not replayed
        self.previous = Self::orientation_of(event)?;
        self.carry.reset();
        Ok(())
    }
}
