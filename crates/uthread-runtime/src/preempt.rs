//! Preemption controller
//!
//! Owns the virtual-time interval timer (`ITIMER_VIRTUAL`) whose
//! `SIGVTALRM` drives involuntary switches, and the masking discipline
//! around critical sections: `mask` swaps the disposition to `SIG_IGN`,
//! `unmask` reinstalls the real handler. Masking is not reference
//! counted; the scheduler guarantees critical sections never nest.
//!
//! Failures here are unrecoverable: the scheduler cannot keep its
//! invariants without working preemption, so every error path reports to
//! stderr and exits with status 1.

use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use uthread_core::error::{SysError, SYS_ERR_HEADER};

/// The installed handler, kept for `unmask` to restore. Zero until
/// `install` has run.
static HANDLER: AtomicUsize = AtomicUsize::new(0);

/// Report an unrecoverable OS failure and abort
pub fn fatal(err: SysError) -> ! {
    eprintln!("{}{}", SYS_ERR_HEADER, err);
    std::process::exit(1);
}

fn set_disposition(disposition: usize) -> Result<(), SysError> {
    unsafe {
        let mut sa: libc::sigaction = mem::zeroed();
        sa.sa_sigaction = disposition;
        sa.sa_flags = 0;
        if libc::sigemptyset(&mut sa.sa_mask) != 0 {
            return Err(SysError::SignalSetInit);
        }
        if libc::sigaction(libc::SIGVTALRM, &sa, ptr::null_mut()) != 0 {
            return Err(SysError::SignalAction);
        }
    }
    Ok(())
}

/// `it_value` / `it_interval` for a quantum, usec field kept under 10^6
fn interval_for(quantum_usecs: i32) -> libc::timeval {
    let usecs = i64::from(quantum_usecs);
    libc::timeval {
        tv_sec: (usecs / 1_000_000) as libc::time_t,
        tv_usec: (usecs % 1_000_000) as libc::suseconds_t,
    }
}

/// Install `handler` for `SIGVTALRM` and arm the virtual timer to fire
/// every `quantum_usecs` microseconds of process-CPU time.
pub fn install(quantum_usecs: i32, handler: extern "C" fn(libc::c_int)) -> Result<(), SysError> {
    HANDLER.store(handler as usize, Ordering::SeqCst);
    set_disposition(handler as usize)?;

    let interval = interval_for(quantum_usecs);
    let timer = libc::itimerval {
        it_interval: interval,
        it_value: interval,
    };
    if unsafe { libc::setitimer(libc::ITIMER_VIRTUAL, &timer, ptr::null_mut()) } != 0 {
        return Err(SysError::TimerArm);
    }
    Ok(())
}

/// Enter a critical section: timer expiries are ignored until `unmask`
pub fn mask() {
    if let Err(err) = set_disposition(libc::SIG_IGN) {
        fatal(err);
    }
}

/// Leave a critical section: reinstall the real handler
///
/// Also clears `SIGVTALRM` from the process signal mask. The switcher
/// long-jumps out of the signal handler instead of returning through
/// sigreturn, which would otherwise leave the signal kernel-blocked
/// forever after the first involuntary switch.
pub fn unmask() {
    let handler = HANDLER.load(Ordering::SeqCst);
    if handler == 0 {
        // timer was never installed; nothing to restore
        return;
    }
    if let Err(err) = set_disposition(handler) {
        fatal(err);
    }

    unsafe {
        let mut set = mem::MaybeUninit::<libc::sigset_t>::uninit();
        if libc::sigemptyset(set.as_mut_ptr()) != 0
            || libc::sigaddset(set.as_mut_ptr(), libc::SIGVTALRM) != 0
        {
            fatal(SysError::SignalSetInit);
        }
        if libc::sigprocmask(libc::SIG_UNBLOCK, set.as_ptr(), ptr::null_mut()) != 0 {
            fatal(SysError::SignalAction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_split() {
        let tv = interval_for(250);
        assert_eq!(tv.tv_sec, 0);
        assert_eq!(tv.tv_usec, 250);

        // values at and above one second spill into tv_sec
        let tv = interval_for(1_000_000);
        assert_eq!(tv.tv_sec, 1);
        assert_eq!(tv.tv_usec, 0);

        let tv = interval_for(2_500_000);
        assert_eq!(tv.tv_sec, 2);
        assert_eq!(tv.tv_usec, 500_000);
    }

    #[test]
    fn test_unmask_before_install_is_noop() {
        // must not touch dispositions while HANDLER is unset
        unmask();
    }
}
