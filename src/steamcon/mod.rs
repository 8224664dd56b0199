//! Steam Controller input support
//!
//! This module turns raw controller frames into labeled input events:
//! - Protocol constants
//! - Report decoding
//! - Edge detection and held-time tracking

pub mod constants;
pub mod types;
pub mod report;
pub mod state;

// Re-export commonly used items
pub use types::*;
pub use report::{decode, DecodeError, FrameBuilder, FrameType, InputReport};
pub use state::{ControllerState, StateTracker};
