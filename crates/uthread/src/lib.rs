//! # uthread - preemptive user-space threads
//!
//! Multiplexes many logical threads onto a single OS thread. Scheduling
//! is round-robin with preemptive time-slicing: a virtual-time interval
//! timer (`ITIMER_VIRTUAL`) ends the running thread's quantum, a
//! hand-written register-save / long-jump pair moves the CPU between
//! per-thread stacks.
//!
//! ## Quick start
//!
//! ```ignore
//! use uthread::{init, spawn, terminate, current_id};
//!
//! fn worker() {
//!     println!("hello from thread {}", current_id());
//!     // a thread ends by terminating itself (or by returning, which
//!     // does the same)
//!     let _ = terminate(current_id());
//! }
//!
//! fn main() {
//!     init(100_000).unwrap();          // 100ms quantum
//!     let tid = spawn(worker).unwrap();
//!     while uthread::quantums(tid).is_ok() {
//!         // the worker preempts us here sooner or later
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!  user code ── init/spawn/block/resume/sync/terminate ──┐
//!                                                        ▼
//!                         ┌──────────────────────────────────┐
//!                         │ scheduler (uthread-runtime)      │
//!                         │ slot table · ready FIFO · sync   │
//!                         │ matrix · quantum counters        │
//!                         └──────┬──────────────────▲────────┘
//!                voluntary switch│                  │SIGVTALRM
//!                                ▼                  │
//!                         context save/restore   ITIMER_VIRTUAL
//! ```
//!
//! The bootstrap thread (id 0) is the caller of [`init`]; it cannot be
//! blocked or sync from, and terminating it ends the process with
//! status 0. All other threads run an entry function on their own
//! guarded stack and are identified by the smallest id that was free at
//! spawn time.
//!
//! Two surfaces: the `Result`-based functions below, and [`api`] with
//! the classic C-style `0 / -1` contract.

pub mod api;
pub mod messages;

// Re-export core types
pub use uthread_core::constants::{MAX_THREADS, STACK_SIZE};
pub use uthread_core::error::{SchedError, SchedResult, SysError};
pub use uthread_core::id::ThreadId;
pub use uthread_core::state::ThreadState;

// Re-export debug logging controls
pub use uthread_core::kprint::{set_log_level, LogLevel};
pub use uthread_core::{kdebug, kerror, kinfo, kwarn};

pub use uthread_runtime::SchedulerConfig;

use uthread_runtime::sched;

/// Initialize the library with a quantum of `quantum_usecs` microseconds
/// of virtual time. The caller becomes the bootstrap thread (id 0) and
/// counts as dispatched once. Must be called before any other operation.
pub fn init(quantum_usecs: i32) -> SchedResult<()> {
    sched::init(quantum_usecs)
}

/// Spawn a thread that will run `entry` on its own stack.
///
/// Returns the smallest free id. `entry` should end with
/// `terminate(current_id())`; returning from it terminates the thread
/// as well.
pub fn spawn(entry: fn()) -> SchedResult<ThreadId> {
    sched::spawn(entry)
}

/// Terminate `tid`, releasing its id for reuse.
///
/// Does not return when `tid` is the calling thread. Terminating the
/// bootstrap thread (id 0) frees all threads and exits the process with
/// status 0.
pub fn terminate(tid: ThreadId) -> SchedResult<()> {
    sched::terminate(tid)
}

/// Block `tid` until a later [`resume`]. Blocking yourself switches away
/// immediately and returns after you are resumed and dispatched again.
/// Already-blocked threads are a success no-op.
pub fn block(tid: ThreadId) -> SchedResult<()> {
    sched::block(tid)
}

/// Move `tid` back to READY. A no-op for threads that are not blocked;
/// a thread still waiting on a sync target stays off the ready queue.
pub fn resume(tid: ThreadId) -> SchedResult<()> {
    sched::resume(tid)
}

/// Suspend the calling thread until `tid` is next dispatched.
///
/// The caller keeps state READY but leaves the ready queue; `tid`
/// finishing its next quantum puts the caller back in line. Forbidden
/// from the bootstrap thread.
pub fn sync(tid: ThreadId) -> SchedResult<()> {
    sched::sync(tid)
}

/// Id of the calling thread
pub fn current_id() -> ThreadId {
    sched::running_id()
}

/// Number of quanta `tid` has been granted so far
pub fn quantums(tid: ThreadId) -> SchedResult<u32> {
    sched::quantums(tid)
}

/// Total number of dispatches since [`init`], across all threads
pub fn total_quantums() -> u32 {
    sched::total_quantums()
}
