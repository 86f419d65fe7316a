//! Error types for the uthread scheduler
//!
//! Two taxonomies: `SchedError` for user errors (reported and returned),
//! and `SysError` for OS-level failures the scheduler cannot recover from
//! (reported and the process exits with status 1).

use core::fmt;

/// Stderr header for unrecoverable OS-level failures
pub const SYS_ERR_HEADER: &str = "system error: ";

/// Stderr header for API misuse
pub const LIB_ERR_HEADER: &str = "thread library error: ";

/// Result type for scheduler operations
pub type SchedResult<T> = Result<T, SchedError>;

/// User errors: returned to the caller, scheduler state unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// `init` was given a non-positive quantum
    InvalidQuantum,

    /// All thread slots are occupied
    MaxThreadsExceeded,

    /// The id is out of range or its slot is empty
    ThreadNotFound,

    /// The bootstrap thread cannot be blocked
    BlockBootstrap,

    /// The bootstrap thread cannot sync on another thread
    SyncFromBootstrap,

    /// Scheduler not initialized
    NotInitialized,

    /// Scheduler already initialized
    AlreadyInitialized,
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::InvalidQuantum => write!(f, "invalid quantum size."),
            SchedError::MaxThreadsExceeded => write!(f, "max thread number exceeded."),
            SchedError::ThreadNotFound => write!(f, "no thread with the requested id."),
            SchedError::BlockBootstrap => write!(f, "the main thread cannot be blocked."),
            SchedError::SyncFromBootstrap => write!(f, "the main thread cannot sync."),
            SchedError::NotInitialized => write!(f, "scheduler not initialized."),
            SchedError::AlreadyInitialized => write!(f, "scheduler already initialized."),
        }
    }
}

impl std::error::Error for SchedError {}

/// Unrecoverable OS-level failures
///
/// The scheduler cannot guarantee its invariants without functioning
/// preemption, so these abort the process after one diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysError {
    /// sigaction failed
    SignalAction,

    /// setitimer failed
    TimerArm,

    /// sigemptyset / sigaddset failed
    SignalSetInit,

    /// mmap or mprotect for a thread stack failed
    StackAlloc,
}

impl fmt::Display for SysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SysError::SignalAction => write!(f, "failed to change a signal action."),
            SysError::TimerArm => write!(f, "failed to set the value of the interval timer."),
            SysError::SignalSetInit => write!(f, "failed to initialize signal set."),
            SysError::StackAlloc => write!(f, "failed memory allocation."),
        }
    }
}

impl std::error::Error for SysError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sched_error_display() {
        assert_eq!(format!("{}", SchedError::InvalidQuantum), "invalid quantum size.");
        assert_eq!(
            format!("{}", SchedError::MaxThreadsExceeded),
            "max thread number exceeded."
        );
    }

    #[test]
    fn test_sys_error_display() {
        assert_eq!(format!("{}", SysError::StackAlloc), "failed memory allocation.");
        assert_eq!(
            format!("{}", SysError::TimerArm),
            "failed to set the value of the interval timer."
        );
    }
}
