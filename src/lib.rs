//! steamcon-rs: Steam Controller to Keyboard/Mouse/Gamepad Bridge
//!
//! This library decodes Steam Controller input reports, tracks the
//! controller state and routes the resulting events through layered action
//! maps whose actuators drive an output backend.

pub mod backend;
pub mod manager;
pub mod mapping;
pub mod steamcon;

// Re-export commonly used items
pub use backend::{MockOutputBackend, OutputBackend};
pub use manager::{ControllerManager, FrameOutcome, ManagerError};
pub use mapping::{Config, Router};
pub use steamcon::{decode, InputEvent, LogicalInput, StateTracker};
