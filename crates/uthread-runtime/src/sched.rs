//! Round-robin scheduler
//!
//! Single process-wide coordinator owning the slot table, ready queue
//! and sync tracker. Public operations mask preemption on entry and
//! unmask on return; the switcher takes over the unmask duty whenever it
//! transfers control. The `SIGVTALRM` handler enters `switch_threads`
//! directly, so the instance lives in a process global reachable without
//! parameters.

use crate::arch;
use crate::config::SchedulerConfig;
use crate::preempt;
use crate::thread::Thread;
use std::sync::atomic::{AtomicBool, Ordering};
use uthread_core::constants::MAX_THREADS;
use uthread_core::error::{SchedError, SchedResult};
use uthread_core::id::ThreadId;
use uthread_core::ready::ReadyQueue;
use uthread_core::slots::SlotTable;
use uthread_core::state::ThreadState;
use uthread_core::sync::SyncTable;
use uthread_core::{kdebug, kerror};

/// Global scheduler instance
///
/// Interior mutation is serialized by the mask discipline: every writer
/// runs with the timer signal ignored, and there is only one OS thread.
static mut SCHEDULER: Option<Scheduler> = None;
static SCHEDULER_INIT: AtomicBool = AtomicBool::new(false);

fn scheduler_mut() -> Option<&'static mut Scheduler> {
    unsafe { (*(&raw mut SCHEDULER)).as_mut() }
}

/// Round-robin scheduler state
pub struct Scheduler {
    config: SchedulerConfig,
    slots: SlotTable<Thread>,
    ready: ReadyQueue,
    sync: SyncTable,
    /// Currently executing thread; NONE only in the window between a
    /// running thread removing itself and the successor being selected
    running: ThreadId,
    total_quantums: u32,
    /// Descriptor of a self-terminated thread, parked until a live
    /// thread can free its stack
    graveyard: Option<Box<Thread>>,
}

impl Scheduler {
    fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            slots: SlotTable::new(MAX_THREADS),
            ready: ReadyQueue::new(MAX_THREADS),
            sync: SyncTable::new(MAX_THREADS),
            running: ThreadId::NONE,
            total_quantums: 0,
            graveyard: None,
        }
    }

    /// The bootstrap thread's first dispatch. It is already executing on
    /// the process stack, so no context setup is involved; it just gets
    /// counted like any other dispatch.
    fn boot(&mut self) {
        let boot = self.slots.insert(ThreadId::BOOTSTRAP, Thread::bootstrap());
        boot.n_quantum = 1;
        self.running = ThreadId::BOOTSTRAP;
        self.total_quantums = 1;
    }

    /// Free the descriptor parked by a self-terminating thread.
    ///
    /// Called on operation entry, never inside the switcher: the caller
    /// is a live thread, so the zombie's stack cannot be the one we are
    /// standing on.
    fn reap_zombie(&mut self) {
        if let Some(zombie) = self.graveyard.take() {
            if self.config.debug_logging {
                kdebug!("reaped thread {}", zombie.id);
            }
        }
    }

    fn spawn(&mut self, entry: fn()) -> SchedResult<ThreadId> {
        self.reap_zombie();

        let id = self
            .slots
            .lowest_free()
            .ok_or(SchedError::MaxThreadsExceeded)?;
        let thread = match Thread::spawned(id, entry, thread_main) {
            Ok(t) => t,
            Err(err) => preempt::fatal(err),
        };

        self.slots.insert(id, thread);
        self.ready.push_back(id);
        if self.config.debug_logging {
            kdebug!("spawned thread {}", id);
        }
        Ok(id)
    }

    fn terminate(&mut self, tid: ThreadId) -> SchedResult<()> {
        self.reap_zombie();

        if !self.slots.contains(tid) {
            return Err(SchedError::ThreadNotFound);
        }
        if tid.is_bootstrap() {
            self.shutdown_and_exit();
        }

        let was_running = self.running == tid;
        if was_running {
            self.running = ThreadId::NONE;
        }

        let thread = self.slots.remove(tid);

        // release whoever synced on this thread, forget its own waits
        let Self { sync, slots, ready, .. } = self;
        sync.purge(tid, |waiter| {
            if let Some(t) = slots.get(waiter) {
                if t.state == ThreadState::Ready {
                    ready.push_back(waiter);
                }
            }
        });
        self.ready.remove(tid);

        if self.config.debug_logging {
            kdebug!("terminated thread {}", tid);
        }

        if was_running {
            // we are standing on this descriptor's stack: park it for a
            // successor to free, then leave without saving a context
            self.graveyard = thread;
            self.switch_threads();
            unreachable!("switch returned into a terminated thread");
        }

        drop(thread);
        Ok(())
    }

    /// Free everything except the stack we may be standing on, then exit.
    /// Terminating the bootstrap thread ends the program.
    fn shutdown_and_exit(&mut self) -> ! {
        let current = self.running;
        for raw in 0..self.slots.capacity() as u32 {
            let id = ThreadId::new(raw);
            if id != current {
                drop(self.slots.remove(id));
            }
        }
        std::process::exit(0);
    }

    fn block(&mut self, tid: ThreadId) -> SchedResult<()> {
        self.reap_zombie();

        if tid.is_bootstrap() {
            return Err(SchedError::BlockBootstrap);
        }
        let thread = self.slots.get_mut(tid).ok_or(SchedError::ThreadNotFound)?;
        if thread.state == ThreadState::Blocked {
            // already blocked: success, no change
            return Ok(());
        }

        thread.state = ThreadState::Blocked;
        self.ready.remove(tid);

        if self.running == tid {
            // comes back only after resume() and a later dispatch
            self.switch_threads();
        }
        Ok(())
    }

    fn resume(&mut self, tid: ThreadId) -> SchedResult<()> {
        self.reap_zombie();

        let thread = self.slots.get_mut(tid).ok_or(SchedError::ThreadNotFound)?;
        thread.state = ThreadState::Ready;

        // a synced thread stays off the queue until its targets run
        if self.sync.waiters_on(tid) > 0 {
            return Ok(());
        }
        self.ready.push_back(tid);
        Ok(())
    }

    fn sync(&mut self, tid: ThreadId) -> SchedResult<()> {
        self.reap_zombie();

        if !self.slots.contains(tid) {
            return Err(SchedError::ThreadNotFound);
        }
        if self.running.is_bootstrap() {
            return Err(SchedError::SyncFromBootstrap);
        }

        self.sync.add_dependency(self.running, tid);
        // off the queue until tid's next dispatch; state stays READY
        self.switch_threads();
        Ok(())
    }

    fn quantums(&self, tid: ThreadId) -> SchedResult<u32> {
        self.slots
            .get(tid)
            .map(|t| t.n_quantum)
            .ok_or(SchedError::ThreadNotFound)
    }

    /// Bookkeeping half of a switch: pick the successor and update
    /// queue, states and counters. Returns the successor's descriptor;
    /// no control transfer happens here.
    fn prepare_switch(&mut self) -> *mut Thread {
        let Self {
            sync,
            slots,
            ready,
            running,
            total_quantums,
            ..
        } = self;
        let prev = *running;

        if prev.is_some() {
            // ending a quantum satisfies every waiter synced on prev
            sync.clear_target(prev, |waiter| {
                if let Some(t) = slots.get(waiter) {
                    if t.state == ThreadState::Ready {
                        ready.push_back(waiter);
                    }
                }
            });

            // the outgoing thread goes back in line before a successor
            // is chosen, so a lone runnable thread redispatches itself
            // instead of draining the queue. It stays out when blocked,
            // gone, or held off by a sync it just entered.
            if let Some(t) = slots.get_mut(prev) {
                if t.state != ThreadState::Blocked {
                    t.state = ThreadState::Ready;
                    if sync.waiters_on(prev) == 0 {
                        ready.push_back(prev);
                    }
                }
            }
        }

        // skip blocked stragglers that were enqueued before blocking
        let next_ptr: *mut Thread = loop {
            let Some(cand) = ready.pop_front() else {
                // unreachable in well-formed programs: the bootstrap
                // thread cannot block or sync, so it is always either
                // running or in the queue
                kerror!("ready queue drained; no dispatchable thread");
                std::process::exit(1);
            };
            if let Some(t) = slots.get_mut(cand) {
                if t.state != ThreadState::Blocked {
                    break t as *mut Thread;
                }
            }
        };

        unsafe {
            (*next_ptr).state = ThreadState::Running;
            (*next_ptr).n_quantum += 1;
            *running = (*next_ptr).id;
        }
        *total_quantums += 1;

        next_ptr
    }

    /// Switch to the next ready thread.
    ///
    /// Voluntary callers reach this with preemption already masked; the
    /// timer handler reaches it unmasked, so it masks again first. The
    /// unmask sits after the context save and before the long jump: the
    /// outgoing thread resumes unmasked, the incoming one starts
    /// unmasked. Never returns when `running` was cleared beforehand.
    fn switch_threads(&mut self) {
        preempt::mask();

        let prev = self.running;
        let next_ptr = self.prepare_switch();

        if prev.is_some() {
            if let Some(prev_thread) = self.slots.get_mut(prev) {
                if unsafe { arch::context_save(&mut prev_thread.ctx) } != 0 {
                    // second return: this thread was just redispatched
                    preempt::unmask();
                    return;
                }
            }
        }

        preempt::unmask();
        unsafe { arch::context_restore(&(*next_ptr).ctx) }
    }
}

/// Entry shim for spawned threads, invoked by the arch trampoline on the
/// thread's own stack. An entry function that returns is terminated in
/// place; `terminate` of the running thread does not come back.
extern "C" fn thread_main(entry: usize) {
    let entry: fn() = unsafe { std::mem::transmute(entry) };
    entry();

    let _ = terminate(running_id());
    unreachable!("terminate of the running thread returned");
}

/// SIGVTALRM handler: an involuntary switch
extern "C" fn timer_signal_handler(_sig: libc::c_int) {
    if let Some(sched) = scheduler_mut() {
        sched.switch_threads();
    }
}

fn with_masked<T>(f: impl FnOnce(&mut Scheduler) -> SchedResult<T>) -> SchedResult<T> {
    preempt::mask();
    let Some(sched) = scheduler_mut() else {
        preempt::unmask();
        return Err(SchedError::NotInitialized);
    };
    let result = f(sched);
    preempt::unmask();
    result
}

// ============================================================================
// Public operations
// ============================================================================

/// Initialize the scheduler and start preemption.
///
/// The caller becomes the bootstrap thread (id 0) and is counted as
/// dispatched once. Must be called exactly once, before any other
/// operation.
pub fn init(quantum_usecs: i32) -> SchedResult<()> {
    let config = SchedulerConfig::new(quantum_usecs);
    config.validate()?;

    if SCHEDULER_INIT.swap(true, Ordering::SeqCst) {
        return Err(SchedError::AlreadyInitialized);
    }

    let mut sched = Scheduler::new(config);
    sched.boot();
    unsafe {
        *(&raw mut SCHEDULER) = Some(sched);
    }

    // the handler may fire as soon as the timer is armed; the instance
    // is already in place
    if let Err(err) = preempt::install(quantum_usecs, timer_signal_handler) {
        preempt::fatal(err);
    }
    kdebug!("scheduler initialized, quantum {} usec", quantum_usecs);
    Ok(())
}

/// Spawn a thread running `entry` on its own stack; returns the new id
/// (the smallest free one)
pub fn spawn(entry: fn()) -> SchedResult<ThreadId> {
    with_masked(|s| s.spawn(entry))
}

/// Terminate a thread. Does not return when `tid` is the caller or the
/// bootstrap thread.
pub fn terminate(tid: ThreadId) -> SchedResult<()> {
    with_masked(|s| s.terminate(tid))
}

/// Block a thread. Blocking yourself returns after a later resume +
/// dispatch; blocking the bootstrap thread is refused.
pub fn block(tid: ThreadId) -> SchedResult<()> {
    with_masked(|s| s.block(tid))
}

/// Move a blocked thread back to READY (and to the ready queue, unless
/// it still waits on a sync target)
pub fn resume(tid: ThreadId) -> SchedResult<()> {
    with_masked(|s| s.resume(tid))
}

/// Suspend the caller until `tid` is next dispatched
pub fn sync(tid: ThreadId) -> SchedResult<()> {
    with_masked(|s| s.sync(tid))
}

/// Number of quanta `tid` has been granted
pub fn quantums(tid: ThreadId) -> SchedResult<u32> {
    match scheduler_mut() {
        Some(s) => s.quantums(tid),
        None => Err(SchedError::NotInitialized),
    }
}

/// Id of the calling thread
pub fn running_id() -> ThreadId {
    match scheduler_mut() {
        Some(s) => s.running,
        None => ThreadId::NONE,
    }
}

/// Total number of dispatches since `init`, the bootstrap's included
pub fn total_quantums() -> u32 {
    match scheduler_mut() {
        Some(s) => s.total_quantums,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() {}

    /// A scheduler with the bootstrap booted, no timer armed. Dispatch
    /// bookkeeping (`prepare_switch`) is exercised directly; nothing
    /// here transfers control.
    fn booted() -> Scheduler {
        let mut sched = Scheduler::new(SchedulerConfig::new(100_000));
        sched.boot();
        sched
    }

    fn id(n: u32) -> ThreadId {
        ThreadId::new(n)
    }

    #[test]
    fn test_boot_state() {
        let sched = booted();
        assert_eq!(sched.running, ThreadId::BOOTSTRAP);
        assert_eq!(sched.total_quantums, 1);
        assert_eq!(sched.quantums(ThreadId::BOOTSTRAP), Ok(1));
        assert!(sched.ready.is_empty());
    }

    #[test]
    fn test_spawn_assigns_smallest_ids() {
        let mut sched = booted();
        assert_eq!(sched.spawn(entry), Ok(id(1)));
        assert_eq!(sched.spawn(entry), Ok(id(2)));
        assert_eq!(sched.spawn(entry), Ok(id(3)));
        assert_eq!(sched.ready.len(), 3);
        assert_eq!(sched.quantums(id(1)), Ok(0));
    }

    #[test]
    fn test_spawn_reuses_terminated_id() {
        let mut sched = booted();
        sched.spawn(entry).unwrap();
        sched.spawn(entry).unwrap();
        sched.spawn(entry).unwrap();

        sched.terminate(id(2)).unwrap();
        assert_eq!(sched.quantums(id(2)), Err(SchedError::ThreadNotFound));
        assert_eq!(sched.spawn(entry), Ok(id(2)));
    }

    #[test]
    fn test_spawn_exhaustion() {
        let mut sched = booted();
        for _ in 1..MAX_THREADS {
            sched.spawn(entry).unwrap();
        }
        assert_eq!(sched.spawn(entry), Err(SchedError::MaxThreadsExceeded));

        // state unchanged: one more slot after a terminate
        sched.terminate(id(5)).unwrap();
        assert_eq!(sched.spawn(entry), Ok(id(5)));
    }

    #[test]
    fn test_terminate_unknown() {
        let mut sched = booted();
        assert_eq!(sched.terminate(id(42)), Err(SchedError::ThreadNotFound));
        assert_eq!(
            sched.terminate(ThreadId::NONE),
            Err(SchedError::ThreadNotFound)
        );
    }

    #[test]
    fn test_terminate_removes_from_ready() {
        let mut sched = booted();
        sched.spawn(entry).unwrap();
        sched.spawn(entry).unwrap();
        sched.terminate(id(1)).unwrap();

        assert!(!sched.ready.contains(id(1)));
        assert!(sched.ready.contains(id(2)));
    }

    #[test]
    fn test_block_rules() {
        let mut sched = booted();
        sched.spawn(entry).unwrap();

        assert_eq!(
            sched.block(ThreadId::BOOTSTRAP),
            Err(SchedError::BlockBootstrap)
        );
        assert_eq!(sched.block(id(9)), Err(SchedError::ThreadNotFound));

        assert_eq!(sched.block(id(1)), Ok(()));
        assert!(!sched.ready.contains(id(1)));
        assert_eq!(sched.slots.get(id(1)).unwrap().state, ThreadState::Blocked);

        // idempotent
        assert_eq!(sched.block(id(1)), Ok(()));
    }

    #[test]
    fn test_resume_requeues_once() {
        let mut sched = booted();
        sched.spawn(entry).unwrap();
        sched.block(id(1)).unwrap();

        assert_eq!(sched.resume(id(1)), Ok(()));
        assert!(sched.ready.contains(id(1)));
        assert_eq!(sched.slots.get(id(1)).unwrap().state, ThreadState::Ready);

        // idempotent, no duplicate in the queue
        assert_eq!(sched.resume(id(1)), Ok(()));
        assert_eq!(sched.ready.len(), 1);
    }

    #[test]
    fn test_dispatch_round_robin() {
        let mut sched = booted();
        sched.spawn(entry).unwrap();
        sched.spawn(entry).unwrap();
        sched.spawn(entry).unwrap();

        // bootstrap running, queue = [1, 2, 3]; over 3k bookkeeping
        // switches every thread gets exactly k dispatches
        let mut dispatched = Vec::new();
        for _ in 0..12 {
            let next = sched.prepare_switch();
            dispatched.push(unsafe { (*next).id.as_u32() });
        }
        assert_eq!(dispatched, vec![1, 2, 3, 0, 1, 2, 3, 0, 1, 2, 3, 0]);
        assert_eq!(sched.quantums(id(1)), Ok(3));
        assert_eq!(sched.quantums(ThreadId::BOOTSTRAP), Ok(1 + 3));
        assert_eq!(sched.total_quantums, 1 + 12);
    }

    #[test]
    fn test_dispatch_skips_blocked() {
        let mut sched = booted();
        sched.spawn(entry).unwrap();
        sched.spawn(entry).unwrap();
        sched.block(id(1)).unwrap();

        let next = sched.prepare_switch();
        assert_eq!(unsafe { (*next).id }, id(2));

        // blocked thread's quantum count is frozen
        assert_eq!(sched.quantums(id(1)), Ok(0));
    }

    #[test]
    fn test_lone_thread_redispatches_itself() {
        let mut sched = booted();

        // only the bootstrap exists: every switch hands the CPU back to
        // it instead of draining the queue
        for round in 2..5 {
            let next = sched.prepare_switch();
            assert_eq!(unsafe { (*next).id }, ThreadId::BOOTSTRAP);
            assert_eq!(sched.quantums(ThreadId::BOOTSTRAP), Ok(round));
        }
        assert_eq!(sched.running, ThreadId::BOOTSTRAP);
        assert!(sched.ready.is_empty());

        // same when every other thread is blocked
        sched.spawn(entry).unwrap();
        sched.block(id(1)).unwrap();
        let next = sched.prepare_switch();
        assert_eq!(unsafe { (*next).id }, ThreadId::BOOTSTRAP);
    }

    /// Drive bookkeeping switches until `tid` is the running thread
    fn dispatch_until(sched: &mut Scheduler, tid: ThreadId) {
        while sched.running != tid {
            sched.prepare_switch();
        }
    }

    #[test]
    fn test_sync_bookkeeping() {
        let mut sched = booted();
        sched.spawn(entry).unwrap(); // 1
        sched.spawn(entry).unwrap(); // 2
        dispatch_until(&mut sched, id(2));

        // 2 syncs on 1: at its switch-out it leaves the queue but its
        // state stays READY, not BLOCKED
        sched.sync.add_dependency(id(2), id(1));
        let next = sched.prepare_switch();
        assert_eq!(unsafe { (*next).id }, id(0));
        assert_eq!(sched.slots.get(id(2)).unwrap().state, ThreadState::Ready);
        assert!(!sched.ready.contains(id(2)));

        // 1 gets dispatched; the waiter is still held
        let next = sched.prepare_switch();
        assert_eq!(unsafe { (*next).id }, id(1));
        assert!(!sched.ready.contains(id(2)));

        // 1's quantum ends: the dependency clears and 2 is back in line
        sched.prepare_switch();
        assert!(sched.ready.contains(id(2)));
        assert_eq!(sched.sync.waiters_on(id(2)), 0);
    }

    #[test]
    fn test_sync_release_waits_for_dispatch_not_block() {
        let mut sched = booted();
        sched.spawn(entry).unwrap(); // 1
        sched.spawn(entry).unwrap(); // 2
        dispatch_until(&mut sched, id(2));

        sched.sync.add_dependency(id(2), id(1));
        sched.prepare_switch(); // 2 parks itself

        // blocking 1 before it runs must not release its waiter
        assert_eq!(sched.block(id(1)), Ok(()));
        assert!(!sched.ready.contains(id(2)));
        assert_eq!(sched.sync.waiters_on(id(2)), 1);
    }

    #[test]
    fn test_terminate_releases_waiters() {
        let mut sched = booted();
        sched.spawn(entry).unwrap(); // 1
        sched.spawn(entry).unwrap(); // 2
        dispatch_until(&mut sched, id(2));

        sched.sync.add_dependency(id(2), id(1));
        sched.prepare_switch(); // 2 parks itself

        sched.terminate(id(1)).unwrap();
        assert!(sched.ready.contains(id(2)));
        assert_eq!(sched.sync.waiters_on(id(2)), 0);
    }

    #[test]
    fn test_resume_while_synced_stays_off_queue() {
        let mut sched = booted();
        sched.spawn(entry).unwrap(); // 1
        sched.spawn(entry).unwrap(); // 2
        dispatch_until(&mut sched, id(2));

        sched.sync.add_dependency(id(2), id(1));
        sched.prepare_switch(); // 2 parks itself
        sched.block(id(2)).unwrap();

        // resume flips the state but the sync counter keeps it parked
        assert_eq!(sched.resume(id(2)), Ok(()));
        assert_eq!(sched.slots.get(id(2)).unwrap().state, ThreadState::Ready);
        assert!(!sched.ready.contains(id(2)));
    }

    #[test]
    fn test_failed_ops_leave_state_unchanged() {
        let mut sched = booted();
        sched.spawn(entry).unwrap();

        let quantums_before = sched.total_quantums;
        let ready_before = sched.ready.len();
        let occupied_before = sched.slots.occupied();

        assert!(sched.terminate(id(50)).is_err());
        assert!(sched.block(id(0)).is_err());
        assert!(sched.block(id(50)).is_err());
        assert!(sched.resume(id(50)).is_err());
        assert!(sched.quantums(id(50)).is_err());

        assert_eq!(sched.total_quantums, quantums_before);
        assert_eq!(sched.ready.len(), ready_before);
        assert_eq!(sched.slots.occupied(), occupied_before);
    }
}
