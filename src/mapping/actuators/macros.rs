//! Macro steps and the macro button
//!
//! A macro button runs its `pressed` steps when pressed, then repeats its
//! `held` steps until released, then runs its `released` steps. Steps run on
//! a background task so `wait` steps never block the frame loop.

use crate::backend::parse_keys;
use crate::mapping::actuators::task::{CancelToken, Task, Wake};
use crate::mapping::actuators::{check_positive, ActuatorError, Context, Side};
use crossbeam_channel::{bounded, Sender};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn default_true() -> bool {
    true
}

/// One scripted output action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MacroStep {
    Press { keys: String },
    Release { keys: String },
    Tap { keys: String },
    MoveMouse {
        x: i32,
        y: i32,
        #[serde(default = "default_true")]
        relative: bool,
    },
    Scroll {
        amount: i32,
        #[serde(default = "default_true")]
        as_clicks: bool,
    },
    PullTrigger { side: Side, amount: u8 },
    MoveStick { side: Side, x: i16, y: i16 },
    Wait { ms: u64 },
    EnterLayer {
        name: String,
        #[serde(default)]
        transparent: bool,
    },
    ExitLayer { name: String },
}

impl MacroStep {
    /// Run the step. Returns `false` if the task was cancelled during a wait.
    pub fn run(&self, ctx: &Context, token: &CancelToken) -> bool {
        match self {
            MacroStep::Press { keys } => ctx.press(&parse_keys(keys)),
            MacroStep::Release { keys } => ctx.release(&parse_keys(keys)),
            MacroStep::Tap { keys } => {
                let keys = parse_keys(keys);
                ctx.press(&keys);
                ctx.release(&keys);
            }
            MacroStep::MoveMouse { x, y, relative } => ctx.move_mouse(*x, *y, *relative),
            MacroStep::Scroll { amount, as_clicks } => ctx.scroll(*amount, *as_clicks),
            MacroStep::PullTrigger { side, amount } => ctx.pull_trigger(*side, *amount),
            MacroStep::MoveStick { side, x, y } => ctx.set_stick(*side, *x, *y),
            MacroStep::Wait { ms } => return token.sleep(Duration::from_millis(*ms)),
            MacroStep::EnterLayer { name, transparent } => ctx.enter_layer(name, *transparent),
            MacroStep::ExitLayer { name } => ctx.exit_layer(name),
        }
        true
    }

    /// Key-bearing steps must name at least one key
    pub fn validate(&self) -> Result<(), ActuatorError> {
        match self {
            MacroStep::Press { keys } | MacroStep::Release { keys } | MacroStep::Tap { keys }
                if parse_keys(keys).is_empty() =>
            {
                Err(ActuatorError::Config(format!("macro step {:?} has no keys", self)))
            }
            _ => Ok(()),
        }
    }
}

/// Keys pressed by `press` steps and not yet released
type Engaged = Arc<Mutex<Vec<String>>>;

fn lock(engaged: &Engaged) -> MutexGuard<'_, Vec<String>> {
    engaged.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn run_steps(steps: &[MacroStep], ctx: &Context, token: &CancelToken, engaged: &Engaged) -> bool {
    steps.iter().all(|step| {
        match step {
            MacroStep::Press { keys } => {
                let mut engaged = lock(engaged);
                for key in parse_keys(keys) {
                    if !engaged.contains(&key) {
                        engaged.push(key);
                    }
                }
            }
            MacroStep::Release { keys } => {
                let keys = parse_keys(keys);
                lock(engaged).retain(|key| !keys.contains(key));
            }
            _ => {}
        }
        step.run(ctx, token)
    })
}

/// Button that plays step sequences
///
/// Each press starts one cycle on a background task: the `pressed` steps
/// always run to the end, the `held` steps repeat until release, then the
/// `released` steps run. Only [`MacroButton::release_all`] cuts a cycle
/// short, and it releases any key the cycle left pressed.
#[derive(Debug)]
pub struct MacroButton {
    ctx: Context,
    pressed: Arc<Vec<MacroStep>>,
    held: Arc<Vec<MacroStep>>,
    released: Arc<Vec<MacroStep>>,
    interval: Duration,
    engaged: Engaged,
    stop: Option<Sender<()>>,
    task: Option<Task>,
}

impl MacroButton {
    pub const DEFAULT_REPETITIONS_PER_SECOND: f64 = 100.0;

    pub fn new(
        ctx: &Context,
        pressed: Vec<MacroStep>,
        held: Vec<MacroStep>,
        released: Vec<MacroStep>,
        repetitions_per_second: f64,
    ) -> Result<Self, ActuatorError> {
        check_positive("repetitions_per_second", repetitions_per_second)?;
        for step in pressed.iter().chain(&held).chain(&released) {
            step.validate()?;
        }
        Ok(Self {
            ctx: ctx.clone(),
            pressed: Arc::new(pressed),
            held: Arc::new(held),
            released: Arc::new(released),
            interval: Duration::from_secs_f64(1.0 / repetitions_per_second),
            engaged: Arc::new(Mutex::new(Vec::new())),
            stop: None,
            task: None,
        })
    }

    pub(crate) fn press(&mut self) -> Result<(), ActuatorError> {
        // Let the previous cycle play out its release steps first
        self.wait();
        let (stop, released_signal) = bounded::<()>(1);
        let ctx = self.ctx.clone();
        let pressed = Arc::clone(&self.pressed);
        let held = Arc::clone(&self.held);
        let released = Arc::clone(&self.released);
        let engaged = Arc::clone(&self.engaged);
        let repeat = (!held.is_empty()).then_some(self.interval);
        self.task = Some(Task::spawn("macro", move |token| {
            if !run_steps(&pressed, &ctx, &token, &engaged) {
                return;
            }
            loop {
                if repeat.is_some() && !run_steps(&held, &ctx, &token, &engaged) {
                    return;
                }
                match token.wait_for(&released_signal, repeat) {
                    Wake::Timeout => {}
                    Wake::Signalled => break,
                    Wake::Cancelled => return,
                }
            }
            run_steps(&released, &ctx, &token, &engaged);
        })?);
        self.stop = Some(stop);
        Ok(())
    }

    pub(crate) fn release(&mut self) -> Result<(), ActuatorError> {
        // Dropping the sender ends the repeat loop
        if self.stop.take().is_none() {
            debug!("Macro released without a running cycle");
        }
        Ok(())
    }

    pub(crate) fn release_all(&mut self) {
        self.stop.take();
        if let Some(mut task) = self.task.take() {
            task.cancel();
        }
        let keys = std::mem::take(&mut *lock(&self.engaged));
        if !keys.is_empty() {
            debug!("Macro teardown releasing {:?}", keys);
            self.ctx.release(&keys);
        }
    }

    /// Let the current cycle run out: a still-held cycle is released, then
    /// joined once its released steps are done.
    pub fn wait(&mut self) {
        self.stop.take();
        if let Some(mut task) = self.task.take() {
            task.join();
        }
    }
}
