//! High-level controller manager
//!
//! Owns the whole pipeline for one controller: raw frames are decoded,
//! diffed against the previous state and the resulting events routed
//! through the action layers.

use crate::backend::OutputBackend;
use crate::mapping::actuators::Context;
use crate::mapping::config::{Config, ConfigError};
use crate::mapping::router::{Router, RouterError};
use crate::steamcon::report::{decode, DecodeError};
use crate::steamcon::state::{ControllerState, StateTracker};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Failed to build action maps: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to decode frame: {0}")]
    Decode(#[from] DecodeError),
}

/// What one frame produced
#[derive(Debug, Default)]
pub struct FrameOutcome {
    /// False for frames that are not input reports
    pub decoded: bool,
    /// Events routed
    pub events: usize,
    /// Events the bound actuators rejected, plus rejected layer changes
    pub errors: Vec<RouterError>,
}

/// Manager for one controller's input pipeline
pub struct ControllerManager {
    tracker: StateTracker,
    router: Router,
    /// Running flag
    running: Arc<AtomicBool>,
}

impl ControllerManager {
    /// Poll interval of [`ControllerManager::run`] (~60Hz)
    pub const POLL_INTERVAL: Duration = Duration::from_millis(16);

    /// Create a new manager, building every action map of `config`
    pub fn new(config: &Config, output: Arc<dyn OutputBackend>) -> Result<Self, ManagerError> {
        let (ctx, effects) = Context::new(output);
        let (base, pool) = config.build_maps(&ctx)?;
        info!(
            "Manager ready: base map '{}' with {} binding(s), {} layer map(s)",
            base.name(),
            base.len(),
            pool.len()
        );
        Ok(Self {
            tracker: StateTracker::new(),
            router: Router::new(base, pool, effects),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Decode one raw frame and route every event it produces
    pub fn process_frame(&mut self, frame: &[u8]) -> Result<FrameOutcome, ManagerError> {
        let mut outcome = FrameOutcome::default();
        outcome.errors.extend(self.router.apply_pending_side_effects());

        let Some(report) = decode(frame)? else {
            trace!("Skipping non-input frame");
            return Ok(outcome);
        };
        outcome.decoded = true;

        for event in self.tracker.update(&report) {
            outcome.events += 1;
            if let Err(e) = self.router.dispatch(&event) {
                warn!("Failed to handle {:?}: {}", event.input(), e);
                outcome.errors.push(e);
            }
        }
        Ok(outcome)
    }

    /// Arm the frame loop. A stop through [`ControllerManager::stop_handle`]
    /// after this point ends [`ControllerManager::run`], even one that has
    /// not begun yet.
    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Manager is already running");
            return;
        }
        info!("Manager started");
    }

    /// Process frames until the channel disconnects or the manager is
    /// stopped. Returns at once unless [`ControllerManager::start`] was called.
    pub fn run(&mut self, frames: &Receiver<Vec<u8>>) {
        if !self.running.load(Ordering::SeqCst) {
            info!("Frame loop not started or already stopped");
            return;
        }
        info!("Frame loop started");

        while self.running.load(Ordering::SeqCst) {
            match frames.recv_timeout(Self::POLL_INTERVAL) {
                Ok(frame) => {
                    if let Err(e) = self.process_frame(&frame) {
                        warn!("Dropped frame: {}", e);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    // Idle: pick up layer changes queued by background tasks
                    self.router.apply_pending_side_effects();
                }
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("Frame channel disconnected");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Frame loop stopped");
    }

    /// Flag that stops [`ControllerManager::run`] from another thread
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Check if the frame loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> &ControllerState {
        self.tracker.state()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Release every output and stop background tasks
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.router.shutdown();
    }
}

impl Drop for ControllerManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
