//! Mock output backend for testing.
//!
//! This backend logs output events instead of actually sending them to the
//! OS, and records them so tests can assert on what the actuators produced.

use crate::backend::{BackendError, OutputBackend};
use log::info;
use std::sync::{Arc, Mutex};

/// One recorded call on the mock backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputCall {
    Press(Vec<String>),
    Release(Vec<String>),
    MoveMouse { dx: i32, dy: i32, relative: bool },
    Scroll { amount: i32, as_clicks: bool },
    LeftTrigger(u8),
    RightTrigger(u8),
    LeftStick(i16, i16),
    RightStick(i16, i16),
}

/// Mock backend that logs events instead of sending them.
///
/// Clones share the same call log.
#[derive(Clone, Debug, Default)]
pub struct MockOutputBackend {
    calls: Arc<Mutex<Vec<OutputCall>>>,
}

impl MockOutputBackend {
    /// Create a new mock output backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every call so far.
    pub fn calls(&self) -> Vec<OutputCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Drain the call log.
    pub fn take_calls(&self) -> Vec<OutputCall> {
        self.calls
            .lock()
            .map(|mut calls| std::mem::take(&mut *calls))
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    /// Keys pressed and not yet released, in press order.
    pub fn held_keys(&self) -> Vec<String> {
        let mut held: Vec<String> = Vec::new();
        for call in self.calls() {
            match call {
                OutputCall::Press(keys) => held.extend(keys),
                OutputCall::Release(keys) => held.retain(|key| !keys.contains(key)),
                _ => {}
            }
        }
        held
    }

    /// Sum of relative mouse movement.
    pub fn total_motion(&self) -> (i32, i32) {
        self.calls().iter().fold((0, 0), |(x, y), call| match call {
            OutputCall::MoveMouse { dx, dy, relative: true } => (x + dx, y + dy),
            _ => (x, y),
        })
    }

    fn record(&self, call: OutputCall) -> Result<(), BackendError> {
        self.calls
            .lock()
            .map_err(|e| BackendError::Operation(e.to_string()))?
            .push(call);
        Ok(())
    }
}

impl OutputBackend for MockOutputBackend {
    fn press(&self, keys: &[String]) -> Result<(), BackendError> {
        info!("[MOCK OUTPUT] Key DOWN: {}", keys.join("+"));
        self.record(OutputCall::Press(keys.to_vec()))
    }

    fn release(&self, keys: &[String]) -> Result<(), BackendError> {
        info!("[MOCK OUTPUT] Key UP: {}", keys.join("+"));
        self.record(OutputCall::Release(keys.to_vec()))
    }

    fn move_mouse(&self, dx: i32, dy: i32, relative: bool) -> Result<(), BackendError> {
        info!("[MOCK OUTPUT] Mouse MOVE: dx={}, dy={} (relative: {})", dx, dy, relative);
        self.record(OutputCall::MoveMouse { dx, dy, relative })
    }

    fn scroll(&self, amount: i32, as_clicks: bool) -> Result<(), BackendError> {
        info!("[MOCK OUTPUT] Mouse SCROLL: {} (clicks: {})", amount, as_clicks);
        self.record(OutputCall::Scroll { amount, as_clicks })
    }

    fn pull_left_trigger(&self, amount: u8) -> Result<(), BackendError> {
        info!("[MOCK OUTPUT] Left trigger: {}", amount);
        self.record(OutputCall::LeftTrigger(amount))
    }

    fn pull_right_trigger(&self, amount: u8) -> Result<(), BackendError> {
        info!("[MOCK OUTPUT] Right trigger: {}", amount);
        self.record(OutputCall::RightTrigger(amount))
    }

    fn set_left_stick(&self, x: i16, y: i16) -> Result<(), BackendError> {
        info!("[MOCK OUTPUT] Left stick: ({}, {})", x, y);
        self.record(OutputCall::LeftStick(x, y))
    }

    fn set_right_stick(&self, x: i16, y: i16) -> Result<(), BackendError> {
        info!("[MOCK OUTPUT] Right stick: ({}, {})", x, y);
        self.record(OutputCall::RightStick(x, y))
    }
}
