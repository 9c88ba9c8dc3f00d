//! Kernel — top-level runtime for control loops
//!
//! Owns one scheduler and runs each registered control loop on its own host
//! thread. Every loop follows the same turn protocol:
//!
//! 1. `login_request`, then `check_login` until it leads
//! 2. one bounded `step` on the shared actuators
//! 3. `hand_off` with the step's preferred successor
//!
//! On `Passed` the loop waits on its ticket and goes straight to the next
//! step when woken. On `Released` it starts over at 1. When the kernel is
//! stopped, a loop that gains leadership resigns and exits, so waiting
//! loops are woken one after another until every thread is gone.
//!
//! Author: Moroya Sakamoto

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::scheduler::{Scheduler, SchedulerStats};
use crate::task::TaskId;
use crate::zone::Handoff;

/// One cooperating control loop
///
/// `step` runs while the loop leads and must return in bounded time. The
/// returned id, if any, is where the round-robin scan starts.
pub trait ControlLoop<const N: usize>: Send + 'static {
    /// Thread name prefix
    fn name(&self) -> &str {
        "loop"
    }

    /// Do one turn of work
    fn step(&mut self) -> Option<TaskId<N>>;
}

impl<const N: usize, F> ControlLoop<N> for F
where
    F: FnMut() -> Option<TaskId<N>> + Send + 'static,
{
    fn step(&mut self) -> Option<TaskId<N>> {
        self()
    }
}

/// Control-loop runtime
///
/// A stopped kernel stays stopped; loops spawned afterwards exit at once.
pub struct Kernel<const N: usize> {
    /// Shared scheduler
    scheduler: Arc<Scheduler<N>>,
    /// Cleared by `stop`
    running: Arc<AtomicBool>,
    /// One thread per occupied slot, yielding its turn count
    loops: [Option<JoinHandle<u64>>; N],
}

impl<const N: usize> Kernel<N> {
    /// Kernel with a fresh scheduler and no loops
    pub fn new() -> Self {
        Self {
            scheduler: Arc::new(Scheduler::new()),
            running: Arc::new(AtomicBool::new(true)),
            loops: core::array::from_fn(|_| None),
        }
    }

    /// Shared scheduler
    pub fn scheduler(&self) -> &Arc<Scheduler<N>> {
        &self.scheduler
    }

    /// Start `ctl` in slot `id`
    pub fn spawn<L: ControlLoop<N>>(&mut self, id: TaskId<N>, mut ctl: L) -> Result<()> {
        let slot = &mut self.loops[id.index()];
        if slot.is_some() {
            return Err(Error::SlotTaken(id.index()));
        }

        let name = format!("{}-{}", ctl.name(), id.index());
        let scheduler = Arc::clone(&self.scheduler);
        let running = Arc::clone(&self.running);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_loop(&scheduler, &running, id, &mut ctl))?;

        *slot = Some(handle);
        log::info!("kernel: {name} started in slot {id}");
        Ok(())
    }

    /// Ask every loop to finish
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        log::info!("kernel: stop requested");
    }

    /// Are loops still taking turns?
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop and wait for every loop
    pub fn join(&mut self) -> KernelStats<N> {
        self.stop();

        let mut turns = [0u64; N];
        for (i, slot) in self.loops.iter_mut().enumerate() {
            if let Some(handle) = slot.take() {
                match handle.join() {
                    Ok(n) => turns[i] = n,
                    Err(_) => log::error!("kernel: loop in slot {i} panicked"),
                }
            }
        }

        KernelStats {
            turns,
            total_turns: turns.iter().sum(),
            scheduler: self.scheduler.snapshot().stats,
        }
    }

    /// Let the loops run for `duration`, then stop and join them
    pub fn run_for(&mut self, duration: Duration) -> KernelStats<N> {
        thread::sleep(duration);
        self.join()
    }
}

impl<const N: usize> Default for Kernel<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Drop for Kernel<N> {
    fn drop(&mut self) {
        if self.loops.iter().any(Option::is_some) {
            self.join();
        }
    }
}

/// Turn loop for one control loop; returns the number of steps taken
fn run_loop<const N: usize, L: ControlLoop<N>>(
    scheduler: &Scheduler<N>,
    running: &AtomicBool,
    id: TaskId<N>,
    ctl: &mut L,
) -> u64 {
    let mut turns = 0u64;

    'login: while running.load(Ordering::Acquire) {
        let mut ticket = scheduler.enter_safe_zone().login_request(id);
        loop {
            ticket.check_login();
            if !running.load(Ordering::Acquire) {
                scheduler.enter_safe_zone().resign(id);
                break 'login;
            }

            let preference = ctl.step();
            turns += 1;

            match scheduler.enter_safe_zone().hand_off(id, preference) {
                Handoff::Passed(next) => ticket = next,
                Handoff::Released => continue 'login,
            }
        }
    }

    log::debug!("kernel: loop {id} exiting after {turns} turns");
    turns
}

/// Kernel execution statistics
#[derive(Debug, Clone, Copy)]
pub struct KernelStats<const N: usize> {
    /// Steps taken per slot
    pub turns: [u64; N],
    /// Steps taken in total
    pub total_turns: u64,
    /// Scheduler counters at join time
    pub scheduler: SchedulerStats,
}
