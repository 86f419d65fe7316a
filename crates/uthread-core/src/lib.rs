//! # uthread-core
//!
//! Core types and containers for the uthread scheduler.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Signals, timers, stacks and context switching live in `uthread-runtime`.
//!
//! ## Modules
//!
//! - `id` - thread identifier type
//! - `state` - thread state enum
//! - `slots` - fixed-capacity slot table with smallest-free allocation
//! - `ready` - duplicate-free FIFO ready queue
//! - `sync` - sync-dependency matrix and waiter counters
//! - `error` - error types
//! - `kprint` - leveled stderr logging macros
//! - `env` - environment variable utilities

pub mod env;
pub mod error;
pub mod id;
pub mod kprint;
pub mod ready;
pub mod slots;
pub mod state;
pub mod sync;

// Re-exports for convenience
pub use error::{SchedError, SchedResult, SysError};
pub use id::ThreadId;
pub use ready::ReadyQueue;
pub use slots::SlotTable;
pub use state::ThreadState;
pub use sync::SyncTable;

/// Compile-time scheduler constants
pub mod constants {
    /// Maximum number of live threads, bootstrap included
    pub const MAX_THREADS: usize = 100;

    /// Usable stack size per spawned thread, in bytes
    pub const STACK_SIZE: usize = 64 * 1024;

    /// Guard page size below each stack (one page, kept inaccessible)
    pub const GUARD_SIZE: usize = 4096;

    /// Sentinel raw value meaning "no thread"
    pub const THREAD_NONE: u32 = u32::MAX;
}
