//! Read-only view of the relay's backlog

use crate::queue::PendingQueue;
use crate::relay::message::RelayMessage;
use std::fmt;
use std::sync::{Arc, Weak};

/// Queue depth gauge, reported as `relay.pending` in `messages`
#[derive(Clone)]
pub struct PendingGauge {
    queue: Weak<PendingQueue<Arc<RelayMessage>>>,
}

impl PendingGauge {
    pub const NAME: &'static str = "relay.pending";
    pub const UNIT: &'static str = "messages";

    pub(crate) fn new(queue: &Arc<PendingQueue<Arc<RelayMessage>>>) -> Self {
        Self {
            queue: Arc::downgrade(queue),
        }
    }

    /// Current number of queued messages, zero once the queue is gone
    pub fn value(&self) -> usize {
        self.queue.upgrade().map_or(0, |queue| queue.size())
    }

    pub fn capacity(&self) -> usize {
        self.queue.upgrade().map_or(0, |queue| queue.capacity())
    }
}

impl fmt::Display for PendingGauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={} {} (capacity {})",
            Self::NAME,
            self.value(),
            Self::UNIT,
            self.capacity()
        )
    }
}
