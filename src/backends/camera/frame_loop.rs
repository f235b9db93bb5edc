// SPDX-License-Identifier: GPL-3.0-only
//! Dedicated worker threads for repeating capture requests
//!
//! Each streaming session owns exactly one [`CaptureWorker`]. The worker runs
//! its loop closure on a named thread until the closure returns
//! [`LoopAction::Stop`] or the owner stops it. Dropping the worker stops and
//! joins the thread, so a worker can never outlive its session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info, warn};

/// Action returned by the loop closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Worker thread running one session's repeating request
///
/// # Example
///
/// ```ignore
/// let worker = CaptureWorker::start("capture-0", move || {
///     match platform.capture_next(&session, &request) {
///         Ok(frame) => target.present(frame),
///         Err(e) => warn!(error = %e, "Capture failed"),
///     }
///     LoopAction::Continue
/// })?;
///
/// // Later, on any exit path
/// worker.stop();
/// ```
pub struct CaptureWorker {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureWorker {
    /// Spawn the worker thread
    ///
    /// The closure is called repeatedly until it returns `LoopAction::Stop`
    /// or [`stop`](Self::stop) is called. Fails only if the OS refuses to
    /// spawn the thread.
    pub fn start<F>(name: &str, mut loop_fn: F) -> std::io::Result<Self>
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        info!(name = %name, "Starting capture worker");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!(name = %name_clone, "Capture worker thread started");

                loop {
                    if stop_signal_clone.load(Ordering::SeqCst) {
                        debug!(name = %name_clone, "Stop signal received");
                        break;
                    }

                    match loop_fn() {
                        LoopAction::Continue => {}
                        LoopAction::Stop => {
                            debug!(name = %name_clone, "Loop requested stop");
                            break;
                        }
                    }
                }

                info!(name = %name_clone, "Capture worker thread exiting");
            })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture worker stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    ///
    /// Waits at most for the iteration in flight. On a multi-threaded tokio
    /// runtime the wait hands the calling worker's tasks to another thread.
    pub fn stop(&mut self) {
        self.request_stop();
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| self.join());
            }
            _ => self.join(),
        }
    }

    /// Wait for the thread to finish without sending the stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "Waiting for capture worker thread to finish");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture worker thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Capture worker thread finished");
            }
        }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureWorker dropped, stopping loop");
            self.stop();
        }
    }
}

impl std::fmt::Debug for CaptureWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureWorker")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}
