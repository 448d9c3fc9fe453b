// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for capture loops
//!
//! Device reads block, so every provider runs its read loop on a dedicated
//! thread. The controller owns that thread, reports the outcome of the
//! device setup back to the async caller and stops the loop on release.

use crate::constants::timing::CAPTURE_STOP_TIMEOUT;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Action returned by the capture loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a capture loop running in a separate thread
///
/// # Example
///
/// ```ignore
/// let (controller, ready) = CaptureLoopController::spawn(
///     "v4l2-capture",
///     || open_device(),
///     move |device| {
///         publish(device.read_frame());
///         LoopAction::Continue
///     },
/// );
/// ready.await??;
/// ```
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    /// Disconnects when the thread exits
    exited: mpsc::Receiver<()>,
    name: String,
}

impl CaptureLoopController {
    /// Start a capture loop whose state is built on the capture thread
    ///
    /// `init_fn` runs first on the new thread; its success or error is sent
    /// through the returned receiver. The state never leaves the thread, so
    /// it does not need to be `Send` (mmap streams usually are not).
    ///
    /// `loop_fn` is then called until it returns [`LoopAction::Stop`] or the
    /// controller is stopped.
    pub fn spawn<S, E, I, F>(
        name: &str,
        init_fn: I,
        mut loop_fn: F,
    ) -> (Self, oneshot::Receiver<Result<(), E>>)
    where
        E: Send + 'static,
        I: FnOnce() -> Result<S, E> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (exit_guard, exited) = mpsc::channel::<()>();

        info!(name = %name, "Starting capture loop");

        let thread_handle = thread::spawn(move || {
            let _exit_guard = exit_guard;
            let mut state = match init_fn() {
                Ok(state) => {
                    debug!(name = %name_clone, "Capture loop initialized");
                    let _ = ready_tx.send(Ok(()));
                    state
                }
                Err(e) => {
                    warn!(name = %name_clone, "Capture loop initialization failed");
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            while !stop_signal_clone.load(Ordering::SeqCst) {
                if loop_fn(&mut state) == LoopAction::Stop {
                    debug!(name = %name_clone, "Loop requested stop");
                    break;
                }
            }

            info!(name = %name_clone, "Capture loop thread exiting");
        });

        let controller = Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            exited,
            name: name.to_string(),
        };
        (controller, ready_rx)
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting
    ///
    /// A loop parked between frames is woken so it sees the signal at once.
    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(handle) = &self.thread_handle {
            handle.thread().unpark();
        }
    }

    /// Stop the loop and wait for the thread to finish
    ///
    /// A thread stuck in a device read for longer than
    /// [`CAPTURE_STOP_TIMEOUT`] is detached; it exits on its next iteration.
    pub fn stop(&mut self) {
        self.request_stop();

        let Some(handle) = self.thread_handle.take() else {
            return;
        };

        // Nothing is ever sent; the channel disconnects when the thread exits
        let waited = self.exited.recv_timeout(CAPTURE_STOP_TIMEOUT);
        if let Err(mpsc::RecvTimeoutError::Timeout) = waited {
            warn!(name = %self.name, "Capture thread did not stop in time, detaching");
            return;
        }

        if handle.join().is_err() {
            warn!(name = %self.name, "Capture loop thread panicked");
        } else {
            debug!(name = %self.name, "Capture loop thread finished");
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop();
        }
    }
}

impl std::fmt::Debug for CaptureLoopController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureLoopController")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::{Duration, Instant};

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let (mut controller, ready) = CaptureLoopController::spawn(
            "test-loop",
            || Ok::<_, String>(()),
            move |_| {
                if counter_clone.fetch_add(1, Ordering::SeqCst) >= 10 {
                    LoopAction::Stop
                } else {
                    LoopAction::Continue
                }
            },
        );

        assert_eq!(ready.blocking_recv().unwrap(), Ok(()));
        while controller.is_running() {
            thread::sleep(Duration::from_millis(1));
        }
        controller.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_stop_signal() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let (mut controller, _ready) = CaptureLoopController::spawn(
            "test-loop",
            || Ok::<_, String>(()),
            move |_| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(10));
                LoopAction::Continue
            },
        );

        thread::sleep(Duration::from_millis(50));
        assert!(controller.is_running());

        controller.stop();
        assert!(!controller.is_running());
        assert!(counter.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_stop_wakes_parked_loop() {
        let (mut controller, ready) = CaptureLoopController::spawn(
            "test-parked-loop",
            || Ok::<_, String>(()),
            |_| {
                thread::park_timeout(Duration::from_secs(30));
                LoopAction::Continue
            },
        );
        ready.blocking_recv().unwrap().unwrap();
        thread::sleep(Duration::from_millis(20));

        let start = Instant::now();
        controller.stop();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(!controller.is_running());
    }

    #[test]
    fn test_state_is_passed_to_loop() {
        let result = Arc::new(AtomicU32::new(0));
        let result_clone = Arc::clone(&result);

        let (mut controller, _ready) = CaptureLoopController::spawn(
            "test-init-loop",
            || Ok::<_, String>(42u32),
            move |state| {
                result_clone.store(*state, Ordering::SeqCst);
                LoopAction::Stop
            },
        );

        controller.stop();
        assert_eq!(result.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_init_failure_is_reported() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);

        let (mut controller, ready) = CaptureLoopController::spawn(
            "test-fail-init",
            || Err::<(), _>("Init failed".to_string()),
            move |_: &mut ()| {
                ran_clone.store(true, Ordering::SeqCst);
                LoopAction::Stop
            },
        );

        assert_eq!(ready.blocking_recv().unwrap(), Err("Init failed".to_string()));
        controller.stop();
        assert!(!ran.load(Ordering::SeqCst));
    }
}
