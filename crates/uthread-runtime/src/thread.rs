//! Thread descriptor

use crate::arch::{self, SavedContext};
use crate::stack::Stack;
use uthread_core::error::SysError;
use uthread_core::id::ThreadId;
use uthread_core::state::ThreadState;

/// Everything the scheduler keeps per logical thread
///
/// Exactly one descriptor exists per live id; it owns the thread's stack
/// and saved context. Descriptors are boxed inside the slot table so the
/// switcher can hold their addresses across bookkeeping.
pub struct Thread {
    /// Immutable after creation
    pub id: ThreadId,
    pub state: ThreadState,
    /// Number of quanta this thread has been granted; never decreases
    pub n_quantum: u32,
    /// Saved execution context, valid whenever the thread is not running
    pub ctx: SavedContext,
    /// Owned stack; `None` for the bootstrap thread (process stack)
    pub stack: Option<Stack>,
    /// Initial entry function; `None` for the bootstrap thread
    pub entry: Option<fn()>,
}

impl Thread {
    /// Descriptor for the caller of `init`: already running, no own
    /// stack, context filled in at its first switch-out.
    pub fn bootstrap() -> Self {
        Self {
            id: ThreadId::BOOTSTRAP,
            state: ThreadState::Running,
            n_quantum: 0,
            ctx: SavedContext::zeroed(),
            stack: None,
            entry: None,
        }
    }

    /// Descriptor for a spawned thread
    ///
    /// Allocates the stack and points the saved context at the entry
    /// trampoline: the first dispatch runs `entry_shim(entry)` on the
    /// fresh stack.
    pub fn spawned(id: ThreadId, entry: fn(), entry_shim: extern "C" fn(usize)) -> Result<Self, SysError> {
        let stack = Stack::new()?;
        let mut ctx = SavedContext::zeroed();
        unsafe {
            arch::init_context(&mut ctx, stack.top(), entry_shim as usize, entry as usize);
        }

        Ok(Self {
            id,
            state: ThreadState::Ready,
            n_quantum: 0,
            ctx,
            stack: Some(stack),
            entry: Some(entry),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn shim(_arg: usize) {}
    fn entry() {}

    #[test]
    fn test_bootstrap_descriptor() {
        let t = Thread::bootstrap();
        assert_eq!(t.id, ThreadId::BOOTSTRAP);
        assert_eq!(t.state, ThreadState::Running);
        assert_eq!(t.n_quantum, 0);
        assert!(t.stack.is_none());
        assert!(t.entry.is_none());
    }

    #[test]
    fn test_spawned_descriptor() {
        let t = Thread::spawned(ThreadId::new(3), entry, shim).unwrap();
        assert_eq!(t.id.as_u32(), 3);
        assert_eq!(t.state, ThreadState::Ready);
        assert_eq!(t.n_quantum, 0);
        assert!(t.stack.is_some());

        // context points into the thread's own stack, below its top
        let top = t.stack.as_ref().unwrap().top() as u64;
        assert!(t.ctx.sp <= top);
        assert!(t.ctx.sp > top - 64);
        assert_ne!(t.ctx.pc, 0);
    }
}
