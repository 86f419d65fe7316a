//! Environment variable utilities

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default
///
/// Unset and unparseable values both fall back to the default.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Get environment variable as boolean
///
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true; any other
/// set value is false; unset returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_get_default() {
        let val: usize = env_get("__UTHREAD_TEST_UNSET__", 42);
        assert_eq!(val, 42);
    }

    #[test]
    fn test_env_get_parse_failure_falls_back() {
        std::env::set_var("__UTHREAD_TEST_BAD__", "not a number");
        let val: u64 = env_get("__UTHREAD_TEST_BAD__", 9);
        assert_eq!(val, 9);
        std::env::remove_var("__UTHREAD_TEST_BAD__");
    }

    #[test]
    fn test_env_get_bool_variants() {
        assert!(env_get_bool("__UTHREAD_TEST_UNSET__", true));
        assert!(!env_get_bool("__UTHREAD_TEST_UNSET__", false));

        std::env::set_var("__UTHREAD_TEST_BOOL__", "yes");
        assert!(env_get_bool("__UTHREAD_TEST_BOOL__", false));

        std::env::set_var("__UTHREAD_TEST_BOOL__", "0");
        assert!(!env_get_bool("__UTHREAD_TEST_BOOL__", true));

        std::env::remove_var("__UTHREAD_TEST_BOOL__");
    }
}
