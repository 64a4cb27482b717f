//! Process-wide wrap configuration.
//!
//! The wrap limit bounds how many world copies a wrapping handler replicates on
//! each side of the rendering envelope centre. It is read once from
//! `GEOWRAP_WRAP_LIMIT` and can be overridden at startup or in tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use tracing::warn;

/// Environment variable holding the wrap limit.
pub const WRAP_LIMIT_ENV: &str = "GEOWRAP_WRAP_LIMIT";

/// Wrap limit used when the environment does not provide a valid one.
pub const DEFAULT_WRAP_LIMIT: u32 = 10;

static WRAP_LIMIT: OnceLock<AtomicU32> = OnceLock::new();

fn cell() -> &'static AtomicU32 {
    WRAP_LIMIT.get_or_init(|| AtomicU32::new(parse_wrap_limit(std::env::var(WRAP_LIMIT_ENV).ok())))
}

/// Parse a raw wrap-limit value, falling back to the default on anything that is
/// not a non-negative integer.
pub fn parse_wrap_limit(raw: Option<String>) -> u32 {
    let Some(raw) = raw else {
        return DEFAULT_WRAP_LIMIT;
    };
    match raw.trim().parse::<u32>() {
        Ok(limit) => limit,
        Err(e) => {
            warn!(
                key = WRAP_LIMIT_ENV,
                value = %raw,
                error = %e,
                "Invalid wrap limit, it should be a non-negative integer. Using the default"
            );
            DEFAULT_WRAP_LIMIT
        }
    }
}

/// Current wrap limit. Zero disables wrapping altogether.
pub fn wrap_limit() -> u32 {
    cell().load(Ordering::Relaxed)
}

/// Override the wrap limit. Meant for startup configuration and tests, not for
/// reconfiguration while rendering is in progress.
pub fn set_wrap_limit(limit: u32) {
    cell().store(limit, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_missing_uses_default() {
        assert_eq!(parse_wrap_limit(None), DEFAULT_WRAP_LIMIT);
    }

    #[test]
    fn test_parse_valid() {
        assert_eq!(parse_wrap_limit(Some("3".into())), 3);
        assert_eq!(parse_wrap_limit(Some(" 0 ".into())), 0);
    }

    #[test]
    fn test_parse_invalid_falls_back() {
        assert_eq!(parse_wrap_limit(Some("-2".into())), DEFAULT_WRAP_LIMIT);
        assert_eq!(parse_wrap_limit(Some("lots".into())), DEFAULT_WRAP_LIMIT);
    }

    #[test]
    fn test_override_roundtrip() {
        let previous = wrap_limit();
        set_wrap_limit(previous + 5);
        assert_eq!(wrap_limit(), previous + 5);
        set_wrap_limit(previous);
        assert_eq!(wrap_limit(), previous);
    }
}
