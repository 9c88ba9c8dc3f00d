//! Wake signal — one-shot binary wait primitive per task slot
//!
//! A signal holds at most one pending wake. `give` raises it (a second
//! `give` before the matching `take` is absorbed), `take` blocks until it is
//! raised and lowers it again. Blocking uses the host condition variable,
//! never a spin loop.
//!
//! Author: Moroya Sakamoto

use crate::sync::{lock_or_recover, wait_or_recover, Condvar, Mutex};

/// Binary wake signal
pub struct WakeSignal {
    /// Pending wake
    raised: Mutex<bool>,
    /// Woken when `raised` goes true
    cv: Condvar,
}

impl WakeSignal {
    /// Create a lowered signal
    pub fn new() -> Self {
        Self {
            raised: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    /// Raise the signal.
    ///
    /// Returns false if a wake was already pending; the signal stays raised
    /// exactly once.
    pub fn give(&self) -> bool {
        let mut raised = lock_or_recover(&self.raised, "wake signal");
        if *raised {
            return false;
        }
        *raised = true;
        drop(raised);
        self.cv.notify_one();
        true
    }

    /// Block until raised, then consume the wake
    pub fn take(&self) {
        let mut raised = lock_or_recover(&self.raised, "wake signal");
        while !*raised {
            raised = wait_or_recover(&self.cv, raised, "wake signal");
        }
        *raised = false;
    }

    /// Consume a pending wake without blocking
    pub fn try_take(&self) -> bool {
        let mut raised = lock_or_recover(&self.raised, "wake signal");
        core::mem::replace(&mut *raised, false)
    }

    /// Is a wake pending?
    pub fn is_raised(&self) -> bool {
        *lock_or_recover(&self.raised, "wake signal")
    }
}

impl core::fmt::Debug for WakeSignal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WakeSignal")
            .field("raised", &self.is_raised())
            .finish()
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}
