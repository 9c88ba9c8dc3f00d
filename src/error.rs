//! Error types
//!
//! The scheduler core never fails: wakes and scans report through `bool`.
//! Errors only arise at the edges, when raw ids are validated and when the
//! kernel starts control-loop threads.
//!
//! Author: Moroya Sakamoto

/// Crate error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("task id {raw} out of range (task count {count})")]
    InvalidTaskId { raw: usize, count: usize },

    #[error("control loop already running in slot {0}")]
    SlotTaken(usize),

    #[error("failed to start control loop thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Crate result alias
pub type Result<T> = core::result::Result<T, Error>;
