//! Generic error handling utilities
//!
//! Separates errors an operator can fix (bad configuration, unreadable input
//! paths) from system failures, so that fatal errors at startup are reported
//! with the right level of detail.

/// Trait for errors that can distinguish between user-actionable and system errors
///
/// When `is_user_actionable()` returns `true`, `user_message()` must return
/// `Some(message)` with a message that tells the operator what to change.
pub trait ContextualError: std::error::Error {
    /// True when the error carries a message the operator can act on directly
    fn is_user_actionable(&self) -> bool;

    /// The operator-facing message for user-actionable errors
    fn user_message(&self) -> Option<&str>;
}

/// Render a fatal error, preferring the user message when there is one
///
/// System errors only show `operation_context` at error level; the full
/// error is always available at debug level.
///
/// # Examples
/// ```rust,no_run
/// use auditrelay::app::cli::ConfigError;
/// use auditrelay::core::error_handling::log_error_with_context;
///
/// let error = ConfigError::InvalidValue {
///     key: "writer.threads".to_string(),
///     message: "Value must be greater than 0".to_string(),
/// };
/// log_error_with_context(&error, "Configuration loading");
/// // Logs: "FATAL: Value must be greater than 0", with the key at debug level
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    log::error!("FATAL: {}", fatal_line(error, operation_context));
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}

fn fatal_line<'a, E: ContextualError>(error: &'a E, operation_context: &'a str) -> &'a str {
    if error.is_user_actionable() {
        error.user_message().unwrap_or(operation_context)
    } else {
        operation_context
    }
}
