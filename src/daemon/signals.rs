// src/daemon/signals.rs

//! SIGTERM-driven graceful shutdown, modeled as a process-wide atomic flag
//! plus a condition variable the main thread parks on.
//!
//! This is the redesigned form of the original C daemon's
//! `SHUTDOWN_SIGNAL sig_atomic_t` checked from inside `pause()`: a
//! background thread blocks on `signal_hook::iterator::Signals` (keeping
//! all the async-signal-safety concerns inside that crate rather than in a
//! raw handler here), then flips the flag and notifies the waiter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use signal_hook::consts::SIGTERM;
use signal_hook::iterator::Signals;

use crate::core::errors::{AntError, AntResult};

/// A shareable shutdown signal. Clone the `Arc` into every component that
/// needs to observe it.
pub struct ShutdownSignal {
    flag: AtomicBool,
    lock: Mutex<()>,
    condvar: Condvar,
}

impl ShutdownSignal {
    /// Registers the SIGTERM handler and returns a handle to the signal.
    pub fn install() -> AntResult<Arc<Self>> {
        let signal = Arc::new(Self {
            flag: AtomicBool::new(false),
            lock: Mutex::new(()),
            condvar: Condvar::new(),
        });

        let mut signals = Signals::new([SIGTERM]).map_err(|e| {
            AntError::AccessDenied(format!("failed to register SIGTERM handler: {e}"))
        })?;

        let handle = signal.clone();
        thread::Builder::new()
            .name("bigsid-signals".into())
            .spawn(move || {
                if signals.forever().next().is_some() {
                    handle.trigger();
                }
            })
            .map_err(|e| AntError::AllocationFailed(format!("failed to spawn signal thread: {e}")))?;

        Ok(signal)
    }

    /// Sets the shutdown flag and wakes any thread parked in `wait`.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let _guard = self.lock.lock().unwrap();
        self.condvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Parks the calling thread until `trigger` is called.
    pub fn wait(&self) {
        let mut guard = self.lock.lock().unwrap();
        while !self.is_triggered() {
            guard = self.condvar.wait(guard).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_wakes_a_waiting_thread() {
        let signal = Arc::new(ShutdownSignal {
            flag: AtomicBool::new(false),
            lock: Mutex::new(()),
            condvar: Condvar::new(),
        });
        let waiter = signal.clone();
        let handle = thread::spawn(move || waiter.wait());

        assert!(!signal.is_triggered());
        signal.trigger();
        handle.join().unwrap();
        assert!(signal.is_triggered());
    }
}
