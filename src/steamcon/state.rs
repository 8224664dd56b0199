//! Frame-to-frame state tracking
//!
//! The tracker diffs every decoded report against the previous one and turns
//! it into an ordered list of events: presses, re-emitted pad holds and
//! synthesized releases carrying the time the control was held.

use crate::steamcon::report::InputReport;
use crate::steamcon::types::{Acceleration, InputEvent, LogicalInput, Orientation, Position};
use log::trace;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Last known value of one identity
#[derive(Debug, Clone)]
struct TrackedInput {
    event: InputEvent,
    pressed_at: Option<Instant>,
}

/// Last known event of every held control and every continuous axis
#[derive(Debug, Clone)]
pub struct ControllerState {
    inputs: BTreeMap<LogicalInput, TrackedInput>,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerState {
    /// State with the continuous axes seeded to neutral
    pub fn new() -> Self {
        let mut inputs = BTreeMap::new();
        let neutral = [
            InputEvent::trigger(LogicalInput::LeftTrigger, 0),
            InputEvent::trigger(LogicalInput::RightTrigger, 0),
            InputEvent::motion(Orientation::default(), Acceleration::default()),
            InputEvent::stick(Position::NEUTRAL),
        ];
        for event in neutral {
            inputs.insert(
                event.input(),
                TrackedInput {
                    event,
                    pressed_at: None,
                },
            );
        }
        Self { inputs }
    }

    pub fn get(&self, input: LogicalInput) -> Option<&InputEvent> {
        self.inputs.get(&input).map(|tracked| &tracked.event)
    }

    /// Whether an edge-triggered control is currently held
    pub fn is_held(&self, input: LogicalInput) -> bool {
        !input.is_continuous() && self.inputs.contains_key(&input)
    }

    /// Identities currently stored, in emission order
    pub fn inputs(&self) -> impl Iterator<Item = LogicalInput> + '_ {
        self.inputs.keys().copied()
    }

    fn store(&mut self, event: InputEvent, pressed_at: Option<Instant>) {
        self.inputs.insert(event.input(), TrackedInput { event, pressed_at });
    }
}

/// Edge detector between consecutive reports
#[derive(Debug, Default)]
pub struct StateTracker {
    state: ControllerState,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Diff a report against the stored state, timestamped now
    pub fn update(&mut self, report: &InputReport) -> Vec<InputEvent> {
        self.update_at(report, Instant::now())
    }

    /// Diff a report against the stored state at an explicit instant
    pub fn update_at(&mut self, report: &InputReport, now: Instant) -> Vec<InputEvent> {
        let mut events = Vec::new();

        for input in [LogicalInput::LeftTrigger, LogicalInput::RightTrigger] {
            if let Some(new) = report.get(input) {
                let both_idle = is_idle_trigger(self.state.get(input)) && is_idle_trigger(Some(new));
                self.state.store(new.clone(), None);
                if !both_idle {
                    events.push(new.clone());
                }
            }
        }

        if let Some(motion) = report.get(LogicalInput::Motion) {
            self.state.store(motion.clone(), None);
            events.push(motion.clone());
        }

        if let Some(stick) = report.get(LogicalInput::Stick) {
            let both_neutral = is_neutral_stick(self.state.get(LogicalInput::Stick))
                && is_neutral_stick(Some(stick));
            self.state.store(stick.clone(), None);
            if !both_neutral {
                events.push(stick.clone());
            }
        }

        for input in LogicalInput::BUTTONS {
            let old = self.state.inputs.get(&input).cloned();
            let new = report.get(input);
            match (old, new) {
                (Some(old), Some(new)) => {
                    self.state.store(new.clone(), old.pressed_at);
                    if input.is_trackpad() {
                        events.push(new.as_hold());
                    }
                }
                (None, Some(new)) => {
                    trace!("{:?} pressed", input);
                    self.state.store(new.clone(), Some(now));
                    events.push(new.clone());
                }
                (Some(old), None) => {
                    // The touch bit flickers while the pad and stick share slot A
                    if input == LogicalInput::LPadTouch && report.oscillating {
                        continue;
                    }
                    let held = old
                        .pressed_at
                        .map(|at| now.saturating_duration_since(at))
                        .unwrap_or(Duration::ZERO);
                    trace!("{:?} released after {:?}", input, held);
                    self.state.inputs.remove(&input);
                    events.push(old.event.as_release(held));
                }
                (None, None) => {}
            }
        }

        events
    }
}

fn is_idle_trigger(event: Option<&InputEvent>) -> bool {
    matches!(event, Some(InputEvent::Trigger { pull: 0, .. }))
}

fn is_neutral_stick(event: Option<&InputEvent>) -> bool {
    matches!(event, Some(InputEvent::Stick { position, .. }) if position.is_neutral())
}
