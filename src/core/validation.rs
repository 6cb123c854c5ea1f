//! Validation utilities for CLI arguments and configuration values
//!
//! Validators return plain `String` errors so they can be used directly as
//! clap value parsers and wrapped into configuration errors elsewhere.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*(ms|s|m|h)?\s*$").expect("duration pattern is valid")
});

/// Parse a duration such as `250ms`, `5s`, `2m` or `1h`
///
/// A bare number is taken as milliseconds.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let captures = DURATION_PATTERN.captures(value).ok_or_else(|| {
        format!("'{value}' is not a valid duration (use e.g. 250ms, 5s, 2m or 1h)")
    })?;

    let amount: u64 = captures[1]
        .parse()
        .map_err(|_| format!("'{value}' is too large for a duration"))?;
    let unit_millis: u64 = match captures.get(2).map(|m| m.as_str()) {
        None | Some("ms") => 1,
        Some("s") => 1_000,
        Some("m") => 60_000,
        Some("h") => 3_600_000,
        Some(other) => return Err(format!("Unknown duration unit '{other}'")),
    };

    amount
        .checked_mul(unit_millis)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("'{value}' is too large for a duration"))
}

/// Parse a duration that must be greater than zero
pub fn parse_positive_duration(value: &str) -> Result<Duration, String> {
    match parse_duration(value)? {
        d if d.is_zero() => Err(format!("'{value}' must be greater than zero")),
        d => Ok(d),
    }
}

/// Validate positive integer value
pub fn validate_positive_int(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid positive integer", value)),
    }
}

/// Validate an HTTP(S) base URI and strip any trailing slash
pub fn validate_base_uri(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    let host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| format!("'{value}' must start with http:// or https://"))?;
    if host.trim_end_matches('/').is_empty() {
        return Err(format!("'{value}' has no host"));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}
