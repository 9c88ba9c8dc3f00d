//! Leader-handoff scheduler
//!
//! One gate (host mutex) guards all scheduling metadata. The wake signals
//! live outside the gate because a task waits on its own signal with the
//! gate released. Metadata is only reachable through the [`SafeZone`] guard
//! returned by [`Scheduler::enter_safe_zone`].
//!
//! Author: Moroya Sakamoto

use crate::signal::WakeSignal;
use crate::sync::{lock_or_recover, Mutex};
use crate::task::{TaskId, TaskSlot, TaskState, TASK_COUNT};
use crate::zone::SafeZone;

/// Scheduler sized for the robot's four control loops
pub type RobotScheduler = Scheduler<TASK_COUNT>;

/// Scheduling counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Successful wakes (leadership handed to a waiting task)
    pub handoffs: u32,
    /// Wakes that demoted a running leader to waiting
    pub preemptions: u32,
    /// Login requests answered immediately
    pub logins_granted: u32,
    /// Login requests that had to wait
    pub logins_deferred: u32,
    /// Round-robin scans started
    pub scans: u32,
    /// Scans that found nobody waiting
    pub empty_scans: u32,
}

/// Metadata behind the gate
#[derive(Debug)]
pub(crate) struct SchedulerState<const N: usize> {
    pub(crate) slots: [TaskSlot; N],
    pub(crate) leader: Option<TaskId<N>>,
    pub(crate) cursor: TaskId<N>,
    pub(crate) stats: SchedulerStats,
}

impl<const N: usize> SchedulerState<N> {
    fn new() -> Self {
        Self {
            slots: [TaskSlot::empty(); N],
            leader: None,
            cursor: TaskId::FIRST,
            stats: SchedulerStats::default(),
        }
    }
}

/// Leader-handoff scheduler for N cooperating tasks
///
/// Fixed size, built once before any control loop starts, never torn down.
/// Share it by reference, `Arc` or a `static`.
pub struct Scheduler<const N: usize> {
    /// Gate around all metadata
    gate: Mutex<SchedulerState<N>>,
    /// One wake signal per slot
    signals: [WakeSignal; N],
}

impl<const N: usize> Scheduler<N> {
    /// All slots idle, no leader, cursor at the first id
    pub fn new() -> Self {
        Self {
            gate: Mutex::new(SchedulerState::new()),
            signals: core::array::from_fn(|_| WakeSignal::new()),
        }
    }

    /// Acquire the gate, blocking until it is free
    pub fn enter_safe_zone(&self) -> SafeZone<'_, N> {
        SafeZone::new(self, lock_or_recover(&self.gate, "scheduler gate"))
    }

    /// Copy of the metadata, taken under the gate
    pub fn snapshot(&self) -> Snapshot<N> {
        self.enter_safe_zone().snapshot()
    }

    /// Number of task slots
    pub const fn task_count(&self) -> usize {
        N
    }

    pub(crate) fn signal(&self, id: TaskId<N>) -> &WakeSignal {
        &self.signals[id.index()]
    }
}

// Printing must not take the gate: the caller may be holding it.
impl<const N: usize> core::fmt::Debug for Scheduler<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &N)
            .finish_non_exhaustive()
    }
}

impl<const N: usize> Default for Scheduler<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the scheduling metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot<const N: usize> {
    /// Per-slot state
    pub states: [TaskState; N],
    /// Per-slot activation counts
    pub activations: [u32; N],
    /// Current leader
    pub leader: Option<TaskId<N>>,
    /// Next round-robin candidate
    pub cursor: TaskId<N>,
    /// Counters
    pub stats: SchedulerStats,
}

impl<const N: usize> Snapshot<N> {
    pub(crate) fn capture(state: &SchedulerState<N>) -> Self {
        Self {
            states: core::array::from_fn(|i| state.slots[i].state),
            activations: core::array::from_fn(|i| state.slots[i].activations),
            leader: state.leader,
            cursor: state.cursor,
            stats: state.stats,
        }
    }

    /// Number of slots in `Active` (0 or 1)
    pub fn active_count(&self) -> usize {
        self.states.iter().filter(|s| **s == TaskState::Active).count()
    }

    /// Ids currently waiting for a wake
    pub fn waiting(&self) -> impl Iterator<Item = TaskId<N>> + '_ {
        TaskId::all().filter(|id| self.states[id.index()] == TaskState::Waiting)
    }

    /// State of one slot
    pub fn state(&self, id: TaskId<N>) -> TaskState {
        self.states[id.index()]
    }
}
