//! PendingQueue: bounded linked FIFO with two lock domains
//!
//! The queue is a singly linked list that starts at an item-less sentinel
//! node. Producers append behind the tail holding only the insert-side lock,
//! classic consumers detach the sentinel holding only the remove-side lock,
//! so the two sides never contend. Operations that must see a stable list
//! (cursor advance, purge, iteration batches, clear) hold both locks,
//! always acquired insert side first.
//!
//! Each node carries a pin counter: the number of cursors standing on it.
//! Pins are only mutated while both locks are held, which is what lets the
//! purge pass test a pin and unlink a node in one critical section.
//! Pins left behind on nodes detached by classic removal are tallied
//! separately; while any remain, purge reclaims nothing.

use crate::core::sync::{handle_mutex_poison, lock_or_recover};
use crate::core::time::Deadline;
use crate::queue::error::{QueueError, QueueResult};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A list node; the sentinel and detached nodes hold no item
pub(crate) struct Node<T> {
    slot: Mutex<Slot<T>>,
    pins: AtomicUsize,
}

pub(crate) struct Slot<T> {
    pub(crate) item: Option<T>,
    pub(crate) next: Option<Arc<Node<T>>>,
    /// Set once the node has been dropped off the head by classic removal
    pub(crate) detached: bool,
}

impl<T> Node<T> {
    fn new(item: Option<T>) -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(Slot {
                item,
                next: None,
                detached: false,
            }),
            pins: AtomicUsize::new(0),
        })
    }

    pub(crate) fn slot(&self) -> MutexGuard<'_, Slot<T>> {
        lock_or_recover(&self.slot)
    }

    pub(crate) fn next(&self) -> Option<Arc<Node<T>>> {
        self.slot().next.clone()
    }

    pub(crate) fn pins(&self) -> usize {
        self.pins.load(Ordering::Acquire)
    }

    pub(crate) fn pin(&self) {
        self.pins.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn unpin(&self) {
        self.pins.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<T: Clone> Node<T> {
    pub(crate) fn item(&self) -> Option<T> {
        self.slot().item.clone()
    }
}

impl<T> Drop for Node<T> {
    // Unwind the chain iteratively; a long list would otherwise recurse
    // once per node while dropping.
    fn drop(&mut self) {
        let mut next = self
            .slot
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .next
            .take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut node) => {
                    next = node
                        .slot
                        .get_mut()
                        .unwrap_or_else(PoisonError::into_inner)
                        .next
                        .take();
                }
                Err(_) => break,
            }
        }
    }
}

pub(crate) struct PutSide<T> {
    pub(crate) tail: Arc<Node<T>>,
}

pub(crate) struct TakeSide<T> {
    pub(crate) head: Arc<Node<T>>,
}

/// Both lock domains held together
pub(crate) struct FullLock<'a, T> {
    pub(crate) put: MutexGuard<'a, PutSide<T>>,
    pub(crate) take: MutexGuard<'a, TakeSide<T>>,
}

/// Bounded, thread-safe FIFO queue with independent cursors
///
/// `PendingQueue` offers classic blocking producer/consumer access
/// ([`try_insert`](Self::try_insert), [`take`](Self::take),
/// [`poll`](Self::poll)), weakly consistent traversal
/// ([`iter`](Self::iter)), any number of forward
/// [`Cursor`](crate::queue::Cursor)s and an in-place
/// [`purge`](Self::purge) that never reclaims a node a cursor stands on.
///
/// # Example
///
/// ```rust
/// use auditrelay::queue::PendingQueue;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), auditrelay::queue::QueueError> {
/// let queue = Arc::new(PendingQueue::new(100)?);
/// let cursor = queue.cursor()?;
///
/// queue.try_insert(1, Duration::from_millis(10))?;
/// assert_eq!(cursor.next_timeout(Duration::from_millis(10))?, Some(1));
///
/// // Reading through a cursor does not remove anything
/// assert_eq!(queue.size(), 1);
/// # Ok(())
/// # }
/// ```
pub struct PendingQueue<T> {
    capacity: usize,
    count: AtomicUsize,
    closed: AtomicBool,

    put_side: Mutex<PutSide<T>>,
    not_full: Condvar,
    new_element: Condvar,

    take_side: Mutex<TakeSide<T>>,
    not_empty: Condvar,

    /// Cursors standing on detached nodes; changed only under the take lock
    detached_pins: AtomicUsize,
}

impl<T> PendingQueue<T> {
    /// Create a queue holding at most `capacity` elements
    pub fn new(capacity: usize) -> QueueResult<Self> {
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity { capacity });
        }
        let sentinel = Node::new(None);
        Ok(Self {
            capacity,
            count: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            put_side: Mutex::new(PutSide {
                tail: Arc::clone(&sentinel),
            }),
            not_full: Condvar::new(),
            new_element: Condvar::new(),
            take_side: Mutex::new(TakeSide { head: sentinel }),
            not_empty: Condvar::new(),
            detached_pins: AtomicUsize::new(0),
        })
    }

    /// Create a queue whose only bound is addressable memory
    pub fn unbounded() -> Self {
        let sentinel = Node::new(None);
        Self {
            capacity: usize::MAX,
            count: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            put_side: Mutex::new(PutSide {
                tail: Arc::clone(&sentinel),
            }),
            not_full: Condvar::new(),
            new_element: Condvar::new(),
            take_side: Mutex::new(TakeSide { head: sentinel }),
            not_empty: Condvar::new(),
            detached_pins: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of elements currently linked into the queue
    pub fn size(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// `capacity - size`; advisory only, another producer may claim the space first
    pub fn remaining_capacity(&self) -> usize {
        self.capacity - self.size()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the queue and wake every blocked producer, consumer and cursor
    ///
    /// Blocked waits return [`QueueError::Closed`]. Elements already queued
    /// stay readable through `take`, `poll` and cursors.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        {
            let _put = lock_or_recover(&self.put_side);
            self.not_full.notify_all();
            self.new_element.notify_all();
        }
        let _take = lock_or_recover(&self.take_side);
        self.not_empty.notify_all();
    }

    fn ensure_open(&self) -> QueueResult<()> {
        if self.is_closed() {
            Err(QueueError::Closed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn lock_put(&self) -> QueueResult<MutexGuard<'_, PutSide<T>>> {
        handle_mutex_poison(self.put_side.lock(), |message| QueueError::Poisoned {
            message,
        })
    }

    pub(crate) fn lock_take(&self) -> QueueResult<MutexGuard<'_, TakeSide<T>>> {
        handle_mutex_poison(self.take_side.lock(), |message| QueueError::Poisoned {
            message,
        })
    }

    /// Acquire both lock domains in the fixed put → take order
    pub(crate) fn fully_lock(&self) -> QueueResult<FullLock<'_, T>> {
        let put = self.lock_put()?;
        let take = self.lock_take()?;
        Ok(FullLock { put, take })
    }

    /// Wait on the new-element signal, releasing the insert-side lock meanwhile
    pub(crate) fn wait_new_element<'a>(
        &self,
        put: MutexGuard<'a, PutSide<T>>,
        timeout: Duration,
    ) -> QueueResult<MutexGuard<'a, PutSide<T>>> {
        let (put, _) = handle_mutex_poison(
            self.new_element.wait_timeout(put, timeout),
            |message| QueueError::Poisoned { message },
        )?;
        Ok(put)
    }

    /// Next live node after `node`
    ///
    /// A node detached by classic removal no longer links anywhere; its
    /// successor is whatever now follows the head.
    pub(crate) fn successor(&self, node: &Node<T>, take: &TakeSide<T>) -> Option<Arc<Node<T>>> {
        let slot = node.slot();
        if slot.detached {
            drop(slot);
            take.head.next()
        } else {
            slot.next.clone()
        }
    }

    fn enqueue(&self, put: &mut PutSide<T>, node: Arc<Node<T>>) {
        put.tail.slot().next = Some(Arc::clone(&node));
        put.tail = node;
        // Every cursor waits on this, not just one
        self.new_element.notify_all();
    }

    /// Cut `node` off the list, tallying any cursors left standing on it
    ///
    /// Requires the take lock, which keeps the node's pin count stable.
    fn detach(&self, node: &Node<T>) {
        {
            let mut slot = node.slot();
            slot.next = None;
            slot.detached = true;
        }
        let pins = node.pins();
        if pins > 0 {
            self.detached_pins.fetch_add(pins, Ordering::AcqRel);
        }
    }

    /// A cursor has stepped off (or dropped its pin on) a detached node
    pub(crate) fn release_detached_pin(&self, _take: &TakeSide<T>) {
        self.detached_pins.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn has_detached_pins(&self) -> bool {
        self.detached_pins.load(Ordering::Acquire) > 0
    }

    fn dequeue(&self, take: &mut TakeSide<T>) -> Option<T> {
        let first = take.head.next()?;
        let item = first.slot().item.take();
        self.detach(&take.head);
        take.head = first;
        item
    }

    /// Unlink `node`, whose predecessor is `pred`
    ///
    /// The unlinked node keeps its forward link so an iterator parked on it
    /// can still reach the rest of the list.
    pub(crate) fn unlink(&self, lock: &mut FullLock<'_, T>, node: &Arc<Node<T>>, pred: &Arc<Node<T>>) {
        let next = {
            let mut slot = node.slot();
            slot.item = None;
            slot.next.clone()
        };
        pred.slot().next = next;
        if Arc::ptr_eq(&lock.put.tail, node) {
            lock.put.tail = Arc::clone(pred);
        }
        if self.count.fetch_sub(1, Ordering::AcqRel) == self.capacity {
            self.not_full.notify_one();
        }
    }

    fn signal_not_empty(&self) {
        let _take = lock_or_recover(&self.take_side);
        self.not_empty.notify_one();
    }

    fn signal_not_full(&self) {
        let _put = lock_or_recover(&self.put_side);
        self.not_full.notify_one();
    }

    /// Link a fresh node while holding the insert-side lock, then wake takers
    fn link(&self, mut put: MutexGuard<'_, PutSide<T>>, item: T) {
        self.enqueue(&mut put, Node::new(Some(item)));
        let c = self.count.fetch_add(1, Ordering::AcqRel);
        if c + 1 < self.capacity {
            self.not_full.notify_one();
        }
        drop(put);
        if c == 0 {
            self.signal_not_empty();
        }
    }

    /// Insert `item`, waiting up to `timeout` for space
    ///
    /// Returns `Ok(false)` when the timeout elapses while the queue is still
    /// full; a zero timeout fails fast without waiting. Nothing is inserted
    /// unless `Ok(true)` is returned.
    pub fn try_insert(&self, item: T, timeout: Duration) -> QueueResult<bool> {
        self.ensure_open()?;
        let deadline = Deadline::after(timeout);
        let mut put = self.lock_put()?;
        while self.size() >= self.capacity {
            self.ensure_open()?;
            let remaining = deadline.remaining();
            if remaining.is_zero() {
                return Ok(false);
            }
            let (guard, _) = handle_mutex_poison(
                self.not_full.wait_timeout(put, remaining),
                |message| QueueError::Poisoned { message },
            )?;
            put = guard;
        }
        self.ensure_open()?;
        self.link(put, item);
        Ok(true)
    }

    /// Insert `item` only if there is space right now
    pub fn insert_if_space(&self, item: T) -> QueueResult<bool> {
        self.ensure_open()?;
        if self.size() >= self.capacity {
            return Ok(false);
        }
        let put = self.lock_put()?;
        if self.size() >= self.capacity {
            return Ok(false);
        }
        self.link(put, item);
        Ok(true)
    }

    /// Insert `item`, failing with [`QueueError::QueueFull`] when there is no space
    pub fn add(&self, item: T) -> QueueResult<()> {
        if self.insert_if_space(item)? {
            Ok(())
        } else {
            Err(QueueError::QueueFull {
                capacity: self.capacity,
            })
        }
    }

    /// Insert `item`, waiting as long as necessary for space
    pub fn put(&self, item: T) -> QueueResult<()> {
        self.ensure_open()?;
        let mut put = self.lock_put()?;
        while self.size() >= self.capacity {
            self.ensure_open()?;
            put = handle_mutex_poison(self.not_full.wait(put), |message| {
                QueueError::Poisoned { message }
            })?;
        }
        self.ensure_open()?;
        self.link(put, item);
        Ok(())
    }

    /// Remove the head while holding the remove-side lock, then wake producers
    fn unlink_head(&self, mut take: MutexGuard<'_, TakeSide<T>>) -> Option<T> {
        let item = self.dequeue(&mut take)?;
        let c = self.count.fetch_sub(1, Ordering::AcqRel);
        if c > 1 {
            self.not_empty.notify_one();
        }
        drop(take);
        if c == self.capacity {
            self.signal_not_full();
        }
        Some(item)
    }

    /// Remove and return the head, waiting as long as necessary
    pub fn take(&self) -> QueueResult<T> {
        let mut take = self.lock_take()?;
        while self.size() == 0 {
            self.ensure_open()?;
            take = handle_mutex_poison(self.not_empty.wait(take), |message| {
                QueueError::Poisoned { message }
            })?;
        }
        self.unlink_head(take).ok_or(QueueError::NoMoreData)
    }

    /// Remove and return the head, waiting up to `timeout`
    pub fn poll(&self, timeout: Duration) -> QueueResult<Option<T>> {
        let deadline = Deadline::after(timeout);
        let mut take = self.lock_take()?;
        while self.size() == 0 {
            self.ensure_open()?;
            let remaining = deadline.remaining();
            if remaining.is_zero() {
                return Ok(None);
            }
            let (guard, _) = handle_mutex_poison(
                self.not_empty.wait_timeout(take, remaining),
                |message| QueueError::Poisoned { message },
            )?;
            take = guard;
        }
        Ok(self.unlink_head(take))
    }

    /// Remove and return the head if there is one
    pub fn try_poll(&self) -> Option<T> {
        if self.size() == 0 {
            return None;
        }
        let take = self.lock_take().ok()?;
        if self.size() == 0 {
            return None;
        }
        self.unlink_head(take)
    }

    /// Drop every element
    ///
    /// All nodes are detached; cursors resynchronise at the new head on
    /// their next advance and hold off purge until then.
    pub fn clear(&self) -> QueueResult<()> {
        let lock = self.fully_lock()?;
        let mut take = lock.take;
        let mut current = Arc::clone(&take.head);
        while let Some(next) = current.next() {
            self.detach(&current);
            next.slot().item = None;
            current = next;
        }
        take.head = current;
        if self.count.swap(0, Ordering::AcqRel) == self.capacity {
            self.not_full.notify_all();
        }
        Ok(())
    }
}

impl<T: Clone> PendingQueue<T> {
    /// Return a copy of the head without removing it
    pub fn peek(&self) -> Option<T> {
        if self.size() == 0 {
            return None;
        }
        let take = self.lock_take().ok()?;
        take.head.next().and_then(|first| first.item())
    }
}

impl<T> fmt::Debug for PendingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingQueue")
            .field("capacity", &self.capacity)
            .field("size", &self.size())
            .field("closed", &self.is_closed())
            .finish()
    }
}
