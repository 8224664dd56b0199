//! Cancellable background tasks
//!
//! Long-press timers, repetition loops and trackball inertia run on named
//! threads. Cancelling a task signals it and waits for it to finish, so no
//! output from the task can happen after [`Task::cancel`] returns.

use crate::mapping::actuators::ActuatorError;
use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{trace, warn};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handed to the task body; reports cancellation
#[derive(Debug)]
pub struct CancelToken {
    signal: Receiver<()>,
}

impl CancelToken {
    /// Sleep for `duration`. Returns `false` as soon as the task is cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        matches!(self.signal.recv_timeout(duration), Err(RecvTimeoutError::Timeout))
    }

    pub fn is_cancelled(&self) -> bool {
        !matches!(self.signal.try_recv(), Err(TryRecvError::Empty))
    }

    /// Block until `signal` fires or disconnects, the task is cancelled, or
    /// `timeout` elapses. `None` waits without a timeout.
    pub fn wait_for(&self, signal: &Receiver<()>, timeout: Option<Duration>) -> Wake {
        let wake = match timeout {
            Some(timeout) => select! {
                recv(self.signal) -> _ => Wake::Cancelled,
                recv(signal) -> _ => Wake::Signalled,
                default(timeout) => Wake::Timeout,
            },
            None => select! {
                recv(self.signal) -> _ => Wake::Cancelled,
                recv(signal) -> _ => Wake::Signalled,
            },
        };
        // Cancellation wins when both are ready
        if wake == Wake::Signalled && self.is_cancelled() {
            Wake::Cancelled
        } else {
            wake
        }
    }
}

/// Why [`CancelToken::wait_for`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Timeout,
    Signalled,
    Cancelled,
}

/// Handle to a running background task
#[derive(Debug)]
pub struct Task {
    name: String,
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Task {
    /// Spawn `body` on a named thread
    pub fn spawn<F>(name: &str, body: F) -> Result<Self, ActuatorError>
    where
        F: FnOnce(CancelToken) + Send + 'static,
    {
        let (cancel, signal) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(CancelToken { signal }))?;
        trace!("Task '{}' started", name);
        Ok(Self {
            name: name.to_string(),
            cancel: Some(cancel),
            handle: Some(handle),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |handle| handle.is_finished())
    }

    /// Signal the task and wait for it to stop
    pub fn cancel(&mut self) {
        // Dropping the sender disconnects the token
        self.cancel.take();
        self.join();
    }

    /// Wait for the task to run to completion
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Task '{}' panicked", self.name);
            } else {
                trace!("Task '{}' finished", self.name);
            }
        }
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_cancel_stops_loop() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let mut task = Task::spawn("test-loop", move |token| {
            while token.sleep(Duration::from_millis(1)) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        task.cancel();
        let after_cancel = ticks.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));

        assert!(task.is_finished());
        assert_eq!(ticks.load(Ordering::SeqCst), after_cancel);
    }

    #[test]
    fn test_cancel_before_timer_fires() {
        let fired = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&fired);
        let mut task = Task::spawn("test-timer", move |token| {
            if token.sleep(Duration::from_secs(5)) {
                flag.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();

        task.cancel();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_wait_for_reports_wake_reason() {
        let (stop, signal) = bounded::<()>(1);
        let wakes = Arc::new(std::sync::Mutex::new(Vec::new()));
        let log = Arc::clone(&wakes);
        let mut task = Task::spawn("test-wait", move |token| {
            let first = token.wait_for(&signal, Some(Duration::from_millis(1)));
            let second = token.wait_for(&signal, None);
            log.lock().unwrap().extend([first, second]);
        })
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        drop(stop);
        task.join();
        assert_eq!(*wakes.lock().unwrap(), vec![Wake::Timeout, Wake::Signalled]);
    }

    #[test]
    fn test_wait_for_sees_cancel() {
        let (_stop, signal) = bounded::<()>(1);
        let woke = Arc::new(std::sync::Mutex::new(None));
        let log = Arc::clone(&woke);
        let mut task = Task::spawn("test-wait-cancel", move |token| {
            *log.lock().unwrap() = Some(token.wait_for(&signal, None));
        })
        .unwrap();

        task.cancel();
        assert_eq!(*woke.lock().unwrap(), Some(Wake::Cancelled));
    }

    #[test]
    fn test_join_waits_for_completion() {
        let done = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&done);
        let mut task = Task::spawn("test-join", move |token| {
            assert!(!token.is_cancelled());
            flag.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        task.join();
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
