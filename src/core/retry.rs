//! Retry utility for handling transient errors in blocking operations
//!
//! Provides configurable retry policies with a fixed delay between attempts.

use std::thread::sleep;
use std::time::Duration;

/// Configurable retry policy for blocking operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Execute an operation, retrying failures that `is_transient` accepts
///
/// Errors rejected by `is_transient` are returned immediately. A policy with
/// `max_attempts` of zero still runs the operation once.
///
/// # Examples
/// ```rust
/// use auditrelay::core::retry::{retry_blocking, RetryPolicy};
///
/// let result = retry_blocking(
///     "downstream_call",
///     &RetryPolicy::default(),
///     || Ok::<String, String>("success".to_string()),
///     |_| true,
/// );
/// assert_eq!(result.unwrap(), "success");
/// ```
pub fn retry_blocking<F, T, E, P>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
    is_transient: P,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(error) if attempt < max_attempts && is_transient(&error) => {
                log::debug!(
                    "Operation '{}' failed on attempt {}/{}, retrying in {:?}: {}",
                    operation_name,
                    attempt,
                    max_attempts,
                    policy.delay,
                    error
                );
                sleep(policy.delay);
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
