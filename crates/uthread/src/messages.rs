//! Diagnostic message strings
//!
//! The wrapper in [`crate::api`] reports API misuse with one tagged line
//! per failure; the bodies here are fixed per operation. Headers live in
//! `uthread_core::error` next to the error types.

pub use uthread_core::error::{LIB_ERR_HEADER, SYS_ERR_HEADER};

/// `terminate` was given an unknown id
pub const LIB_ERR_TERMINATE: &str = "failed to terminate requested thread.";

/// `block` was given an unknown id or the bootstrap thread
pub const LIB_ERR_BLOCK: &str = "failed to block requested thread.";

/// `resume` was given an unknown id
pub const LIB_ERR_RESUME: &str = "failed to resume requested thread.";

/// `sync` was given an unknown id or called from the bootstrap thread
pub const LIB_ERR_SYNC: &str = "failed to sync requested thread.";
