//! Per-thread stacks
//!
//! Each spawned thread owns one anonymous mmap region: a `PROT_NONE`
//! guard page at the low end, `STACK_SIZE` usable bytes above it. A
//! runaway stack hits the guard page and faults instead of silently
//! corrupting a neighbouring thread. The bootstrap thread has no `Stack`;
//! it runs on the process stack.

use std::ptr;
use uthread_core::constants::{GUARD_SIZE, STACK_SIZE};
use uthread_core::error::SysError;

/// Owned, guarded stack region
pub struct Stack {
    base: *mut u8,
    total_size: usize,
}

impl Stack {
    /// Map a fresh stack. Failure here is a system error: the caller is
    /// expected to report and abort, not to retry.
    pub fn new() -> Result<Self, SysError> {
        let total_size = GUARD_SIZE + STACK_SIZE;

        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                total_size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(SysError::StackAlloc);
        }

        // guard page at the low end stays inaccessible
        let ret = unsafe { libc::mprotect(base, GUARD_SIZE, libc::PROT_NONE) };
        if ret != 0 {
            unsafe {
                libc::munmap(base, total_size);
            }
            return Err(SysError::StackAlloc);
        }

        Ok(Self {
            base: base as *mut u8,
            total_size,
        })
    }

    /// Highest address of the usable region; the initial stack pointer.
    /// Page-aligned, which satisfies both ABIs' 16-byte requirement.
    #[inline]
    pub fn top(&self) -> *mut u8 {
        unsafe { self.base.add(self.total_size) }
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base as *mut libc::c_void, self.total_size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_alloc_and_top() {
        let stack = Stack::new().unwrap();
        let top = stack.top();

        assert!(!top.is_null());
        assert_eq!(top as usize % 16, 0);

        // the usable region right below the top is writable
        unsafe {
            let p = top.sub(8) as *mut u64;
            p.write(0xdead_beef);
            assert_eq!(p.read(), 0xdead_beef);
        }
    }

    #[test]
    fn test_stacks_are_disjoint() {
        let a = Stack::new().unwrap();
        let b = Stack::new().unwrap();

        let a_range = (a.top() as usize - STACK_SIZE)..(a.top() as usize);
        assert!(!a_range.contains(&(b.top() as usize - 8)));
    }
}
