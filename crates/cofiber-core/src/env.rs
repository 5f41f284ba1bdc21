//! Environment variable helpers for runtime configuration overrides
//!
//! ```ignore
//! use cofiber_core::env::{env_get, env_get_bool, env_get_size};
//!
//! let max_fibers: usize = env_get("COF_MAX_FIBERS", 16);
//! let stack_size = env_get_size("COF_STACK_SIZE", 1024 * 1024); // accepts "512K", "2M"
//! let debug = env_get_bool("COF_DEBUG", false);
//! ```

use std::str::FromStr;

/// Parse `key` as `T`, falling back to `default` when unset or malformed
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Boolean flag: "1", "true", "yes", "on" (any case) are true, anything
/// else set is false, unset is `default`
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Byte size with an optional K/M/G suffix (powers of 1024)
#[inline]
pub fn env_get_size(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_size(&v))
        .unwrap_or(default)
}

/// Parse "4096", "64K", "64k", "1M", "1MiB", "2G"
pub fn parse_size(s: &str) -> Option<usize> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit() && c != '_').unwrap_or(s.len());
    let (digits, suffix) = s.split_at(split);
    let value: usize = digits.replace('_', "").parse().ok()?;

    let shift = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 0,
        "k" | "kb" | "kib" => 10,
        "m" | "mb" | "mib" => 20,
        "g" | "gb" | "gib" => 30,
        _ => return None,
    };
    value.checked_mul(1usize << shift)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_get_default() {
        let val: usize = env_get("__COF_TEST_UNSET__", 42);
        assert_eq!(val, 42);
        assert!(env_get_bool("__COF_TEST_UNSET__", true));
        assert_eq!(env_get_size("__COF_TEST_UNSET__", 7), 7);
    }

    #[test]
    fn test_env_get_with_set_var() {
        std::env::set_var("__COF_TEST_NUM__", " 12 ");
        let val: usize = env_get("__COF_TEST_NUM__", 0);
        assert_eq!(val, 12);

        std::env::set_var("__COF_TEST_NUM__", "twelve");
        let val: usize = env_get("__COF_TEST_NUM__", 3);
        assert_eq!(val, 3);
        std::env::remove_var("__COF_TEST_NUM__");
    }

    #[test]
    fn test_env_get_bool_variants() {
        for (raw, expected) in [("1", true), ("TRUE", true), ("on", true), ("0", false), ("nope", false)] {
            std::env::set_var("__COF_TEST_BOOL__", raw);
            assert_eq!(env_get_bool("__COF_TEST_BOOL__", !expected), expected, "{}", raw);
        }
        std::env::remove_var("__COF_TEST_BOOL__");
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4096"), Some(4096));
        assert_eq!(parse_size("64K"), Some(64 * 1024));
        assert_eq!(parse_size("64 kib"), Some(64 * 1024));
        assert_eq!(parse_size("1M"), Some(1024 * 1024));
        assert_eq!(parse_size("1_048_576"), Some(1024 * 1024));
        assert_eq!(parse_size("2G"), Some(2 << 30));
        assert_eq!(parse_size("12Q"), None);
        assert_eq!(parse_size("M"), None);
        assert_eq!(parse_size(""), None);
    }

    #[test]
    fn test_env_get_size_suffix() {
        std::env::set_var("__COF_TEST_SIZE__", "256K");
        assert_eq!(env_get_size("__COF_TEST_SIZE__", 0), 256 * 1024);
        std::env::remove_var("__COF_TEST_SIZE__");
    }
}
