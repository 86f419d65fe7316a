//! Scheduler configuration
//!
//! The quantum comes from the `init` argument; the debug knobs come from
//! the environment so demo programs can be inspected without rebuilding.
//!
//! Environment variables:
//! - `UTHREAD_DEBUG` - enable lifecycle logging at debug level (0/1)

use uthread_core::env::env_get_bool;
use uthread_core::error::{SchedError, SchedResult};

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Length of one quantum in microseconds of virtual (process-CPU) time
    pub quantum_usecs: i32,
    /// Log spawn/terminate/reap events at debug level
    pub debug_logging: bool,
}

impl SchedulerConfig {
    /// Config for the given quantum, debug knobs from the environment
    pub fn new(quantum_usecs: i32) -> Self {
        Self {
            quantum_usecs,
            debug_logging: env_get_bool("UTHREAD_DEBUG", false),
        }
    }

    /// A quantum must be a positive number of microseconds.
    pub fn validate(&self) -> SchedResult<()> {
        if self.quantum_usecs <= 0 {
            return Err(SchedError::InvalidQuantum);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_quantum() {
        assert!(SchedulerConfig::new(1).validate().is_ok());
        assert!(SchedulerConfig::new(100_000).validate().is_ok());
    }

    #[test]
    fn test_invalid_quantum() {
        assert_eq!(
            SchedulerConfig::new(0).validate(),
            Err(SchedError::InvalidQuantum)
        );
        assert_eq!(
            SchedulerConfig::new(-5).validate(),
            Err(SchedError::InvalidQuantum)
        );
    }

    #[test]
    fn test_debug_logging_from_env() {
        std::env::set_var("UTHREAD_DEBUG", "1");
        assert!(SchedulerConfig::new(1000).debug_logging);

        std::env::remove_var("UTHREAD_DEBUG");
        assert!(!SchedulerConfig::new(1000).debug_logging);
    }
}
