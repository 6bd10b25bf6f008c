// SPDX-License-Identifier: GPL-3.0-only

//! Capture threads and the latest-frame mailbox
//!
//! Sensor drivers deliver frames on their own schedule, usually from a
//! blocking call. Each stream gets a capture thread that blocks on the driver
//! and publishes into a [`FrameSlot`]; the render loop polls the slot without
//! ever waiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Action returned by one capture iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Keep capturing
    Continue,
    /// Leave the loop
    Stop,
}

#[derive(Debug)]
struct SlotState<T> {
    latest: Option<T>,
    failure: Option<String>,
    overwritten: u64,
}

/// Single-value mailbox holding the newest frame of one stream
///
/// Publishing replaces whatever was there; the reader only ever sees the most
/// recent frame. A failure recorded by the capture thread is sticky and is
/// reported on every later `take`.
#[derive(Debug)]
pub struct FrameSlot<T> {
    inner: Arc<Mutex<SlotState<T>>>,
}

impl<T> Clone for FrameSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SlotState {
                latest: None,
                failure: None,
                overwritten: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        // A panicking capture thread must not take the render loop down too
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a new frame, replacing an unread one
    pub fn publish(&self, frame: T) {
        let mut state = self.lock();
        if state.latest.replace(frame).is_some() {
            state.overwritten += 1;
        }
    }

    /// Record that the stream can no longer deliver frames
    pub fn fail(&self, reason: impl Into<String>) {
        let mut state = self.lock();
        if state.failure.is_none() {
            state.failure = Some(reason.into());
        }
    }

    /// Take the newest frame, if any
    ///
    /// Returns `Err` once the capture side has failed.
    pub fn take(&self) -> Result<Option<T>, String> {
        let mut state = self.lock();
        if let Some(reason) = &state.failure {
            return Err(reason.clone());
        }
        Ok(state.latest.take())
    }

    /// Number of frames replaced before anyone read them
    pub fn overwritten(&self) -> u64 {
        self.lock().overwritten
    }
}

/// Owner of one capture thread
///
/// Dropping the controller stops the thread and waits for it.
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureLoopController {
    /// Run `loop_fn` on a new thread until it returns [`LoopAction::Stop`] or
    /// the controller is stopped
    pub fn start<F>(name: &str, mut loop_fn: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        Self::start_with_init(name, || Ok(()), move |_: &mut ()| loop_fn())
    }

    /// Like [`start`](Self::start), but build per-thread state first
    ///
    /// Stream handles that must live on the capture thread are created in
    /// `init_fn`. If it fails the loop never runs; reporting the failure to
    /// the reader is up to `init_fn`.
    pub fn start_with_init<S, I, F>(name: &str, init_fn: I, mut loop_fn: F) -> Self
    where
        S: 'static,
        I: FnOnce() -> Result<S, String> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, "Starting capture thread");

        let thread_handle = thread::spawn(move || {
            let mut state = match init_fn() {
                Ok(s) => s,
                Err(e) => {
                    warn!(name = %thread_name, error = %e, "Capture thread initialization failed");
                    return;
                }
            };

            while !thread_stop.load(Ordering::SeqCst) {
                if loop_fn(&mut state) == LoopAction::Stop {
                    debug!(name = %thread_name, "Capture loop requested stop");
                    break;
                }
            }

            info!(name = %thread_name, "Capture thread exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Ask the thread to stop without waiting
    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Ask the thread to stop and wait for it
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread without signalling it
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "Joining capture thread");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}
