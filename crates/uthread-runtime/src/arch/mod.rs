//! Architecture-specific context switching
//!
//! Hand-written register save / long-jump pair. `context_save` has
//! two-return semantics: it returns 0 on the saving path and 1 when the
//! context is later resumed through `context_restore`. Only the stack
//! pointer, resume address and callee-saved registers are kept; both
//! call sites are ordinary function calls, so the caller-saved half of
//! the register file is dead there by ABI.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        mod x86_64;
        pub use x86_64::{context_save, context_restore, init_context};
    } else if #[cfg(target_arch = "aarch64")] {
        mod aarch64;
        pub use aarch64::{context_save, context_restore, init_context};
    } else {
        compile_error!("uthread-runtime supports x86_64 and aarch64 only");
    }
}

/// Saved execution context
///
/// Layout is fixed (`repr(C)`) because the asm addresses fields by
/// offset: `sp` at 0x00, `pc` at 0x08, `regs` from 0x10. The meaning of
/// `regs` slots is per-architecture.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SavedContext {
    pub sp: u64,
    pub pc: u64,
    pub regs: [u64; 12],
}

impl SavedContext {
    pub const fn zeroed() -> Self {
        Self {
            sp: 0,
            pc: 0,
            regs: [0; 12],
        }
    }
}
