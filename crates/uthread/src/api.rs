//! C-style API wrapper
//!
//! The classic thin surface over the scheduler: every mutating call
//! returns `0` on success and `-1` on failure, printing one tagged line
//! to stderr per failure. Hosts porting from the C interface use this
//! module; Rust callers are better served by the `Result`-based
//! functions in the crate root.

use crate::messages;
use libc::c_int;
use uthread_core::error::LIB_ERR_HEADER;
use uthread_core::id::ThreadId;
use uthread_runtime::sched;

fn report(msg: impl std::fmt::Display) {
    eprintln!("{}{}", LIB_ERR_HEADER, msg);
}

/// Negative ids map to the NONE sentinel, which every operation rejects
/// as out of range
fn tid_from(tid: c_int) -> ThreadId {
    if tid < 0 {
        ThreadId::NONE
    } else {
        ThreadId::new(tid as u32)
    }
}

/// Initialize the library. Returns 0, or -1 on a non-positive quantum.
pub fn uthread_init(quantum_usecs: c_int) -> c_int {
    match sched::init(quantum_usecs) {
        Ok(()) => 0,
        Err(err) => {
            report(err);
            -1
        }
    }
}

/// Create a thread for `entry`. Returns the new tid, or -1 when the
/// thread table is full.
pub fn uthread_spawn(entry: fn()) -> c_int {
    match sched::spawn(entry) {
        Ok(tid) => tid.as_u32() as c_int,
        Err(err) => {
            report(err);
            -1
        }
    }
}

/// Terminate `tid`. Does not return on self-termination or `tid == 0`.
pub fn uthread_terminate(tid: c_int) -> c_int {
    match sched::terminate(tid_from(tid)) {
        Ok(()) => 0,
        Err(_) => {
            report(messages::LIB_ERR_TERMINATE);
            -1
        }
    }
}

/// Block `tid`. Blocking the bootstrap thread is refused.
pub fn uthread_block(tid: c_int) -> c_int {
    match sched::block(tid_from(tid)) {
        Ok(()) => 0,
        Err(_) => {
            report(messages::LIB_ERR_BLOCK);
            -1
        }
    }
}

/// Resume a blocked thread.
pub fn uthread_resume(tid: c_int) -> c_int {
    match sched::resume(tid_from(tid)) {
        Ok(()) => 0,
        Err(_) => {
            report(messages::LIB_ERR_RESUME);
            -1
        }
    }
}

/// Suspend the caller until `tid` is next dispatched.
pub fn uthread_sync(tid: c_int) -> c_int {
    match sched::sync(tid_from(tid)) {
        Ok(()) => 0,
        Err(_) => {
            report(messages::LIB_ERR_SYNC);
            -1
        }
    }
}

/// Id of the calling thread.
pub fn uthread_get_tid() -> c_int {
    let id = sched::running_id();
    if id.is_none() {
        -1
    } else {
        id.as_u32() as c_int
    }
}

/// Total quanta started since init, the bootstrap's first one included.
pub fn uthread_get_total_quantums() -> c_int {
    sched::total_quantums() as c_int
}

/// Quanta granted to `tid`, or -1 if no such thread.
pub fn uthread_get_quantums(tid: c_int) -> c_int {
    match sched::quantums(tid_from(tid)) {
        Ok(n) => n as c_int,
        Err(_) => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing here calls uthread_init: these cover the wrapper's error
    // mapping before the scheduler exists, which keeps the process free
    // of a ticking ITIMER_VIRTUAL during the test run.

    #[test]
    fn test_ops_fail_closed_before_init() {
        assert_eq!(uthread_terminate(1), -1);
        assert_eq!(uthread_block(1), -1);
        assert_eq!(uthread_resume(1), -1);
        assert_eq!(uthread_sync(1), -1);
        assert_eq!(uthread_spawn(|| {}), -1);
    }

    #[test]
    fn test_getters_before_init() {
        assert_eq!(uthread_get_tid(), -1);
        assert_eq!(uthread_get_total_quantums(), 0);
        assert_eq!(uthread_get_quantums(0), -1);
    }

    #[test]
    fn test_init_rejects_bad_quantum() {
        // fails validation before any state is touched, so the global
        // scheduler stays uninitialized for the other tests
        assert_eq!(uthread_init(0), -1);
        assert_eq!(uthread_init(-100), -1);
    }

    #[test]
    fn test_negative_tid_is_rejected() {
        assert_eq!(uthread_terminate(-3), -1);
        assert_eq!(uthread_get_quantums(-1), -1);
        assert!(tid_from(-7).is_none());
    }
}
