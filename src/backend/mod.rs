//! Backend abstraction for output injection
//!
//! This module provides the single interface actuators use to drive the
//! virtual keyboard, mouse, triggers and sticks. Platform implementations
//! live outside this crate; the mock backend logs and records every call.

pub mod mock_output;

pub use mock_output::{MockOutputBackend, OutputCall};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend operation failed: {0}")]
    Operation(String),

    #[error("Unsupported key: {0}")]
    UnsupportedKey(String),
}

/// Unified output interface driven by the actuators
pub trait OutputBackend: Send + Sync {
    /// Press keys or mouse buttons (down event for each)
    fn press(&self, keys: &[String]) -> Result<(), BackendError>;

    /// Release keys or mouse buttons (up event for each)
    fn release(&self, keys: &[String]) -> Result<(), BackendError>;

    /// Move the pointer by (dx, dy), or to (dx, dy) when `relative` is false
    fn move_mouse(&self, dx: i32, dy: i32, relative: bool) -> Result<(), BackendError>;

    /// Scroll the wheel by `amount` clicks or raw wheel units
    fn scroll(&self, amount: i32, as_clicks: bool) -> Result<(), BackendError>;

    /// Set the virtual left trigger (0..=255)
    fn pull_left_trigger(&self, amount: u8) -> Result<(), BackendError>;

    /// Set the virtual right trigger (0..=255)
    fn pull_right_trigger(&self, amount: u8) -> Result<(), BackendError>;

    /// Set the virtual left stick
    fn set_left_stick(&self, x: i16, y: i16) -> Result<(), BackendError>;

    /// Set the virtual right stick
    fn set_right_stick(&self, x: i16, y: i16) -> Result<(), BackendError>;

    /// Press then release
    fn tap(&self, keys: &[String]) -> Result<(), BackendError> {
        self.press(keys)?;
        self.release(keys)?;
        Ok(())
    }
}

/// Split a key combo such as `"shift+w"` into its key names
pub fn parse_keys(combo: &str) -> Vec<String> {
    combo
        .split('+')
        .map(|key| key.trim().to_lowercase())
        .filter(|key| !key.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys() {
        assert_eq!(parse_keys("w"), vec!["w"]);
        assert_eq!(parse_keys("Shift + W"), vec!["shift", "w"]);
        assert!(parse_keys(" + ").is_empty());
    }
}
