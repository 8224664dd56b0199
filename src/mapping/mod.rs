//! Mapping module - turns controller events into keyboard, mouse and gamepad output

pub mod actuators;
pub mod config;
pub mod router;

pub use actuators::{Actuate, Actuator, ActuatorError, Context, SideEffect};
pub use config::{Config, ConfigError};
pub use router::{ActionLayer, ActionMap, Router, RouterError};
