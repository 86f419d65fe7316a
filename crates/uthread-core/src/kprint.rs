//! Leveled stderr logging macros
//!
//! Runtime-internal diagnostics, kernel-printk style. Distinct from the
//! tagged `"system error:"` / `"thread library error:"` lines the public
//! API emits; those are part of the interface, these are for debugging.
//!
//! Environment:
//! - `UTHREAD_LOG_LEVEL` - off|error|warn|info|debug (or 0..4), default info
//! - `UTHREAD_FLUSH_EPRINT` - flush stderr after each line (crash debugging)
//!
//! Never called on the signal-handler path.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Log levels, lowest to most verbose
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl LogLevel {
    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "[ERROR]",
            LogLevel::Warn => "[WARN] ",
            LogLevel::Info => "[INFO] ",
            LogLevel::Debug => "[DEBUG]",
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static FLUSH_ENABLED: AtomicBool = AtomicBool::new(false);
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Read `UTHREAD_LOG_LEVEL` / `UTHREAD_FLUSH_EPRINT`. Called lazily on
/// first use; calling it explicitly makes initialization deterministic.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    if let Ok(val) = std::env::var("UTHREAD_LOG_LEVEL") {
        let level = match val.to_lowercase().as_str() {
            "off" | "0" => LogLevel::Off,
            "error" | "1" => LogLevel::Error,
            "warn" | "2" => LogLevel::Warn,
            "debug" | "4" => LogLevel::Debug,
            _ => LogLevel::Info,
        };
        LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    }

    FLUSH_ENABLED.store(
        crate::env::env_get_bool("UTHREAD_FLUSH_EPRINT", false),
        Ordering::Relaxed,
    );
}

pub fn set_log_level(level: LogLevel) {
    INITIALIZED.store(true, Ordering::SeqCst);
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Check if a log level is enabled
#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    level as u8 <= LOG_LEVEL.load(Ordering::Relaxed)
}

#[doc(hidden)]
pub fn emit(level: LogLevel, args: core::fmt::Arguments<'_>) {
    let mut err = std::io::stderr().lock();
    let _ = writeln!(err, "{} {}", level.prefix(), args);
    if FLUSH_ENABLED.load(Ordering::Relaxed) {
        let _ = err.flush();
    }
}

#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {
        if $crate::kprint::level_enabled($crate::kprint::LogLevel::Error) {
            $crate::kprint::emit($crate::kprint::LogLevel::Error, format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {
        if $crate::kprint::level_enabled($crate::kprint::LogLevel::Warn) {
            $crate::kprint::emit($crate::kprint::LogLevel::Warn, format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {
        if $crate::kprint::level_enabled($crate::kprint::LogLevel::Info) {
            $crate::kprint::emit($crate::kprint::LogLevel::Info, format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {
        if $crate::kprint::level_enabled($crate::kprint::LogLevel::Debug) {
            $crate::kprint::emit($crate::kprint::LogLevel::Debug, format_args!($($arg)*));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Info < LogLevel::Debug);
    }

    #[test]
    fn test_set_level_gates_macros() {
        set_log_level(LogLevel::Warn);
        assert!(level_enabled(LogLevel::Error));
        assert!(level_enabled(LogLevel::Warn));
        assert!(!level_enabled(LogLevel::Info));

        set_log_level(LogLevel::Debug);
        assert!(level_enabled(LogLevel::Debug));
    }
}
