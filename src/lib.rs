//! Baton-RTOS — leader-handoff scheduling for cooperating control loops
//!
//! One baton, N runners: exactly one control loop owns the actuators at a
//! time, and hands them on explicitly.
//!
//! - Static task table (no heap in the scheduler, N fixed at build time)
//! - One gate for all metadata, reachable only through a `SafeZone` guard
//! - Per-task wake signals, waited on only after the gate is released
//! - Round-robin fairness with a rotating cursor, bounded to N wakes per scan
//!
//! ```
//! use baton_rtos::task::robot::{DRIVE, LINE};
//! use baton_rtos::{Handoff, RobotScheduler};
//!
//! let sched = RobotScheduler::new();
//!
//! // Drive loop, one turn
//! sched.enter_safe_zone().login_request(DRIVE).check_login();
//! // ... bounded work on the motors ...
//! match sched.enter_safe_zone().hand_off(DRIVE, Some(LINE)) {
//!     Handoff::Passed(ticket) => ticket.check_login(),
//!     Handoff::Released => {}
//! };
//! ```
//!
//! Author: Moroya Sakamoto

pub mod error;
pub mod kernel;
pub mod scheduler;
pub mod signal;
mod sync;
pub mod task;
pub mod zone;

pub use error::{Error, Result};
pub use kernel::{ControlLoop, Kernel, KernelStats};
pub use scheduler::{RobotScheduler, Scheduler, SchedulerStats, Snapshot};
pub use signal::WakeSignal;
pub use task::{TaskId, TaskSlot, TaskState, TASK_COUNT};
pub use zone::{Handoff, SafeZone, Ticket};
