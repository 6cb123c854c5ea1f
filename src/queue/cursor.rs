//! Cursor: independent forward reader over a PendingQueue
//!
//! A cursor never removes anything. It stands on a node (initially the
//! sentinel head) and pins it, which keeps the purge pass from reclaiming
//! that node or anything after it. A cursor stranded on a node that classic
//! removal detached holds purge off entirely until it advances or drops. Any number of threads may share one
//! cursor; each element it yields goes to exactly one caller.

use crate::core::sync::handle_mutex_poison;
use crate::core::time::Deadline;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::pending::{Node, PendingQueue};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

type Filter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Forward-only reader handle for a [`PendingQueue`]
///
/// Created with [`PendingQueue::cursor`] or
/// [`PendingQueue::cursor_with_filter`]. The cursor holds only a weak
/// reference to its queue and releases its pin when dropped.
///
/// # Example
///
/// ```rust
/// use auditrelay::queue::PendingQueue;
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), auditrelay::queue::QueueError> {
/// let queue = Arc::new(PendingQueue::new(10)?);
/// let evens = queue.cursor_with_filter(|n: &u32| n % 2 == 0)?;
///
/// for n in 1..=6 {
///     queue.add(n)?;
/// }
///
/// assert_eq!(evens.next()?, 2);
/// assert_eq!(evens.next()?, 4);
/// assert_eq!(evens.next()?, 6);
/// assert!(evens.next().is_err());
/// # Ok(())
/// # }
/// ```
pub struct Cursor<T> {
    queue: Weak<PendingQueue<T>>,
    position: Mutex<Arc<Node<T>>>,
    filter: Option<Filter<T>>,
}

impl<T> PendingQueue<T> {
    /// Create a cursor positioned before the current first element
    pub fn cursor(self: &Arc<Self>) -> QueueResult<Cursor<T>> {
        self.open_cursor(None)
    }

    /// Create a cursor that only yields elements matching `filter`
    pub fn cursor_with_filter<F>(self: &Arc<Self>, filter: F) -> QueueResult<Cursor<T>>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.open_cursor(Some(Box::new(filter)))
    }

    fn open_cursor(self: &Arc<Self>, filter: Option<Filter<T>>) -> QueueResult<Cursor<T>> {
        let lock = self.fully_lock()?;
        let head = Arc::clone(&lock.take.head);
        head.pin();
        drop(lock);

        Ok(Cursor {
            queue: Arc::downgrade(self),
            position: Mutex::new(head),
            filter,
        })
    }
}

/// Result of one scan from the cursor position
enum Scan<T> {
    Found(T),
    Nothing,
}

impl<T: Clone> Cursor<T> {
    fn queue(&self) -> QueueResult<Arc<PendingQueue<T>>> {
        self.queue.upgrade().ok_or(QueueError::QueueDropped)
    }

    fn accepts(&self, item: &T) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(item))
    }

    /// Walk forward from the current position
    ///
    /// The caller holds the insert-side lock; the remove-side lock is taken
    /// here, so the pin moves with both held. A cursor left on a detached
    /// node restarts from the head and always leaves the detached node.
    fn scan(&self, queue: &PendingQueue<T>) -> QueueResult<Scan<T>> {
        let mut position = handle_mutex_poison(self.position.lock(), |message| {
            QueueError::Poisoned { message }
        })?;
        let take = queue.lock_take()?;

        let stranded = position.slot().detached;
        let mut examined = if stranded {
            Arc::clone(&take.head)
        } else {
            Arc::clone(&position)
        };
        let mut found = Scan::Nothing;
        while let Some(next) = queue.successor(&examined, &take) {
            examined = next;
            if let Some(item) = examined.item() {
                if self.accepts(&item) {
                    found = Scan::Found(item);
                    break;
                }
            }
        }

        if !Arc::ptr_eq(&examined, &position) {
            position.unpin();
            if stranded {
                queue.release_detached_pin(&take);
            }
            examined.pin();
            *position = examined;
        }
        Ok(found)
    }

    /// Advance to the next matching element without waiting
    ///
    /// Returns [`QueueError::NoMoreData`] when no matching element is
    /// currently visible past the cursor.
    pub fn next(&self) -> QueueResult<T> {
        let queue = self.queue()?;
        let _put = queue.lock_put()?;
        match self.scan(&queue)? {
            Scan::Found(item) => Ok(item),
            Scan::Nothing => Err(QueueError::NoMoreData),
        }
    }

    /// Advance to the next matching element, waiting up to `timeout` for one
    ///
    /// Returns `Ok(None)` on timeout. Elements already visible are returned
    /// even after the queue has been closed; a wait on a closed queue
    /// returns [`QueueError::Closed`].
    pub fn next_timeout(&self, timeout: Duration) -> QueueResult<Option<T>> {
        let queue = self.queue()?;
        let deadline = Deadline::after(timeout);
        let mut put = queue.lock_put()?;
        loop {
            if let Scan::Found(item) = self.scan(&queue)? {
                return Ok(Some(item));
            }
            if queue.is_closed() {
                return Err(QueueError::Closed);
            }
            let remaining = deadline.remaining();
            if remaining.is_zero() {
                return Ok(None);
            }
            put = queue.wait_new_element(put, remaining)?;
        }
    }
}

impl<T> Drop for Cursor<T> {
    fn drop(&mut self) {
        let position = self
            .position
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        match self.queue.upgrade() {
            Some(queue) => {
                // Pins only change with both locks held
                if let Ok(lock) = queue.fully_lock() {
                    position.unpin();
                    if position.slot().detached {
                        queue.release_detached_pin(&lock.take);
                    }
                }
            }
            None => position.unpin(),
        }
    }
}

impl<T> fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("filtered", &self.filter.is_some())
            .field("queue_alive", &(self.queue.strong_count() > 0))
            .finish()
    }
}
