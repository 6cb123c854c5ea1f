//! Synchronization utilities for robust mutex handling
//!
//! Lock domains that guard structural invariants report poisoning as an
//! application error so callers can stop using the damaged structure. Leaf
//! locks that only guard single-assignment state recover the inner value.

use std::sync::{LockResult, Mutex, MutexGuard, PoisonError};

/// Handle poisoned lock or condition-variable results with consistent error handling
///
/// Works for anything returned wrapped in a `LockResult`: plain mutex guards as
/// well as the `(guard, timeout)` pairs produced by `Condvar::wait_timeout`.
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use auditrelay::core::sync::handle_mutex_poison;
/// use auditrelay::queue::QueueError;
///
/// let mutex = Mutex::new(42);
/// let guard = handle_mutex_poison(
///     mutex.lock(),
///     |message| QueueError::Poisoned { message }
/// ).unwrap();
/// assert_eq!(*guard, 42);
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|_| {
        error_constructor(
            "Internal synchronisation error (mutex poisoned). This indicates a panic occurred while holding a lock."
                .to_string(),
        )
    })
}

/// Lock a leaf mutex, recovering the guard if a previous holder panicked
///
/// Only suitable for state where every mutation is a single assignment, so a
/// panic can never leave the value half-updated.
pub fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[derive(Debug, PartialEq)]
    struct TestError {
        message: String,
    }

    fn poisoned_mutex() -> Arc<Mutex<i32>> {
        let mutex = Arc::new(Mutex::new(42));
        let mutex_clone = Arc::clone(&mutex);

        // Poison the mutex by panicking while holding the lock
        let _ = thread::spawn(move || {
            let _guard = mutex_clone.lock().unwrap();
            panic!("Intentional panic to poison mutex");
        })
        .join();

        mutex
    }

    #[test]
    fn test_handle_mutex_poison_success() {
        let mutex = Arc::new(Mutex::new(42));
        let result = handle_mutex_poison(mutex.lock(), |msg| TestError { message: msg });

        assert!(result.is_ok());
        assert_eq!(*result.unwrap(), 42);
    }

    #[test]
    fn test_handle_mutex_poison_with_poisoned_mutex() {
        let mutex = poisoned_mutex();

        let result = handle_mutex_poison(mutex.lock(), |msg| TestError { message: msg });

        let error = result.unwrap_err();
        assert!(error.message.contains("mutex poisoned"));
        assert!(error.message.contains("panic occurred"));
    }

    #[test]
    fn test_lock_or_recover_returns_value_after_poison() {
        let mutex = poisoned_mutex();

        let guard = lock_or_recover(&mutex);
        assert_eq!(*guard, 42);
    }
}
