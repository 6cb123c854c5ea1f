//! Weakly consistent traversal
//!
//! Iteration copies elements out in batches, taking both locks once per
//! batch rather than once per element. Between batches producers, consumers
//! and purges proceed freely; the iterator sees each element at most once
//! and never fails because of concurrent modification.

use crate::queue::error::QueueResult;
use crate::queue::pending::{Node, PendingQueue};
use std::collections::VecDeque;
use std::sync::Arc;

/// Maximum number of elements copied per lock acquisition
pub const ITER_BATCH_SIZE: usize = 64;

/// Iterator over a snapshot-free view of a [`PendingQueue`]
///
/// As an [`Iterator`] it simply ends if a lock turns out to be poisoned;
/// call [`try_next`](Self::try_next) where that failure must be seen.
pub struct Iter<'a, T> {
    queue: &'a PendingQueue<T>,
    position: Option<Arc<Node<T>>>,
    batch: VecDeque<T>,
    done: bool,
}

impl<T: Clone> PendingQueue<T> {
    /// Iterate from the current head to whatever tail is visible at the time
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            queue: self,
            position: None,
            batch: VecDeque::with_capacity(ITER_BATCH_SIZE),
            done: false,
        }
    }

    /// Visit every element in FIFO order
    pub fn for_each<V>(&self, mut visitor: V) -> QueueResult<()>
    where
        V: FnMut(&T),
    {
        let mut iter = self.iter();
        while let Some(item) = iter.try_next()? {
            visitor(&item);
        }
        Ok(())
    }

    /// Visit elements in FIFO order until `stop` holds for a visited element
    ///
    /// `stop` is evaluated after `visitor` has seen the element. Returns the
    /// number of elements visited.
    pub fn for_each_until<V, S>(&self, mut visitor: V, mut stop: S) -> QueueResult<usize>
    where
        V: FnMut(&T),
        S: FnMut(&T) -> bool,
    {
        let mut iter = self.iter();
        let mut visited = 0;
        while let Some(item) = iter.try_next()? {
            visitor(&item);
            visited += 1;
            if stop(&item) {
                break;
            }
        }
        Ok(visited)
    }

    /// Copy the queue contents, head first
    pub fn to_vec(&self) -> QueueResult<Vec<T>> {
        let mut items = Vec::with_capacity(self.size());
        self.for_each(|item| items.push(item.clone()))?;
        Ok(items)
    }
}

impl<T: Clone + PartialEq> PendingQueue<T> {
    pub fn contains(&self, needle: &T) -> QueueResult<bool> {
        let mut iter = self.iter();
        while let Some(item) = iter.try_next()? {
            if &item == needle {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<T: Clone> Iter<'_, T> {
    /// Next element, reporting lock failures instead of ending silently
    pub fn try_next(&mut self) -> QueueResult<Option<T>> {
        if self.batch.is_empty() && !self.done {
            self.refill()?;
        }
        Ok(self.batch.pop_front())
    }

    fn refill(&mut self) -> QueueResult<()> {
        let lock = self.queue.fully_lock()?;
        let mut current = match self.position.take() {
            Some(node) => node,
            None => Arc::clone(&lock.take.head),
        };
        while self.batch.len() < ITER_BATCH_SIZE {
            match self.queue.successor(&current, &lock.take) {
                Some(next) => {
                    current = next;
                    if let Some(item) = current.item() {
                        self.batch.push_back(item);
                    }
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }
        self.position = Some(current);
        Ok(())
    }
}

impl<T: Clone> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match self.try_next() {
            Ok(item) => item,
            Err(e) => {
                log::warn!("queue iteration ended early: {e}");
                self.done = true;
                None
            }
        }
    }
}
