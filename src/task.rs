//! Task identity and per-slot state — static, no-alloc task table entries
//!
//! Each control loop owns one fixed slot for the lifetime of the process.
//! Ids are validated once at construction, so indexing a slot table with a
//! `TaskId<N>` can never go out of bounds.
//!
//! Author: Moroya Sakamoto

use core::fmt;

use crate::error::Error;

/// Number of control loops on the robot
pub const TASK_COUNT: usize = 4;

/// Validated task id in `[0, N)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId<const N: usize>(usize);

impl<const N: usize> TaskId<N> {
    /// First id; also the initial round-robin cursor
    pub const FIRST: TaskId<N> = TaskId::must(0);

    /// Checked constructor
    pub const fn new(raw: usize) -> Option<Self> {
        if raw < N {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Const constructor for build-time ids.
    ///
    /// Out-of-range ids fail const evaluation, so a bad table entry is a
    /// compile error rather than a runtime fault.
    pub const fn must(raw: usize) -> Self {
        assert!(raw < N, "task id out of range");
        Self(raw)
    }

    /// Slot index
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Next id in round-robin order (wraps modulo N)
    #[inline]
    pub const fn next(self) -> Self {
        Self((self.0 + 1) % N)
    }

    /// All ids in increasing order
    pub fn all() -> impl Iterator<Item = TaskId<N>> {
        (0..N).map(TaskId)
    }
}

impl<const N: usize> TryFrom<usize> for TaskId<N> {
    type Error = Error;

    fn try_from(raw: usize) -> Result<Self, Self::Error> {
        TaskId::new(raw).ok_or(Error::InvalidTaskId { raw, count: N })
    }
}

impl<const N: usize> From<TaskId<N>> for usize {
    fn from(id: TaskId<N>) -> usize {
        id.0
    }
}

impl<const N: usize> fmt::Display for TaskId<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Scheduling state of one slot
///
/// Single source of truth for "blocked": a slot is blocked iff `Waiting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    /// Not asking for leadership
    #[default]
    Idle,
    /// Asked for leadership and must wait for a wake
    Waiting,
    /// Current leader, owns the actuators
    Active,
}

impl TaskState {
    /// Is the slot blocked waiting for a wake?
    pub fn is_blocked(self) -> bool {
        self == TaskState::Waiting
    }
}

/// Static slot descriptor, one per task id
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskSlot {
    /// Current state
    pub state: TaskState,
    /// Times this slot became the leader
    pub activations: u32,
}

impl TaskSlot {
    /// Fresh slot: idle, never activated
    pub const fn empty() -> Self {
        Self {
            state: TaskState::Idle,
            activations: 0,
        }
    }
}

/// Robot control-loop assignment
pub mod robot {
    use super::{TaskId, TASK_COUNT};

    /// Drive / engine loop
    pub const DRIVE: TaskId<TASK_COUNT> = TaskId::must(0);
    /// Line-tracking loop
    pub const LINE: TaskId<TASK_COUNT> = TaskId::must(1);
    /// Obstacle-cruise loop
    pub const CRUISE: TaskId<TASK_COUNT> = TaskId::must(2);
    /// Lane-change indicator loop
    pub const INDICATOR: TaskId<TASK_COUNT> = TaskId::must(3);

    const NAMES: [&str; TASK_COUNT] = ["drive", "line", "cruise", "light"];

    /// Short name used for thread names and logs
    pub fn name_of(id: TaskId<TASK_COUNT>) -> &'static str {
        NAMES[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_bounds() {
        assert_eq!(TaskId::<4>::new(3).map(TaskId::index), Some(3));
        assert!(TaskId::<4>::new(4).is_none());
        assert!(TaskId::<1>::new(0).is_some());
    }

    #[test]
    fn test_task_id_try_from() {
        let ok: Result<TaskId<4>, _> = TaskId::try_from(2usize);
        assert_eq!(ok.map(usize::from).ok(), Some(2));

        let err = TaskId::<4>::try_from(9usize).unwrap_err();
        assert!(matches!(err, Error::InvalidTaskId { raw: 9, count: 4 }));
    }

    #[test]
    fn test_next_wraps() {
        let last = TaskId::<4>::must(3);
        assert_eq!(last.next(), TaskId::FIRST);
        assert_eq!(TaskId::<4>::FIRST.next().index(), 1);
    }

    #[test]
    fn test_all_ids_in_order() {
        let ids: Vec<usize> = TaskId::<4>::all().map(TaskId::index).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_only_waiting_is_blocked() {
        assert!(!TaskState::Idle.is_blocked());
        assert!(TaskState::Waiting.is_blocked());
        assert!(!TaskState::Active.is_blocked());
        assert_eq!(TaskSlot::empty().state, TaskState::Idle);
    }

    #[test]
    fn test_robot_names() {
        assert_eq!(robot::name_of(robot::DRIVE), "drive");
        assert_eq!(robot::name_of(robot::INDICATOR), "light");
        assert_eq!(robot::CRUISE.to_string(), "#2");
    }
}
