//! Host blocking primitives
//!
//! Plain `std` on the target; `loom` under `--cfg loom` so the model checker
//! can explore every interleaving of the gate and the wake signals.

#[cfg(not(loom))]
pub(crate) use std::sync::{Condvar, Mutex, MutexGuard};

#[cfg(loom)]
pub(crate) use loom::sync::{Condvar, Mutex, MutexGuard};

/// Lock with poison recovery.
///
/// Everything behind these locks is plain data that stays consistent between
/// statements, so a panic in another holder leaves nothing half-written.
pub(crate) fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poison) => {
            log::warn!("{what} lock poisoned by a panicked holder, recovering");
            poison.into_inner()
        }
    }
}

/// Condvar wait with the same recovery policy.
pub(crate) fn wait_or_recover<'a, T>(
    cv: &Condvar,
    guard: MutexGuard<'a, T>,
    what: &str,
) -> MutexGuard<'a, T> {
    match cv.wait(guard) {
        Ok(guard) => guard,
        Err(poison) => {
            log::warn!("{what} lock poisoned during wait, recovering");
            poison.into_inner()
        }
    }
}
