//! In-place purge of reclaimable elements
//!
//! The pass walks from the sentinel with both locks held and unlinks every
//! element the caller deems reclaimable, stopping as soon as it reaches a
//! node a cursor stands on. Nothing at or beyond the earliest cursor is ever
//! touched, and a cursor left on a detached node counts as being at the head.

use crate::core::time::{Budget, SystemTimeProvider, TimeProvider};
use crate::queue::error::QueueResult;
use crate::queue::pending::PendingQueue;
use std::sync::Arc;
use std::time::Duration;

/// Why a purge pass stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PurgeHalt {
    /// Reached the end of the list
    Exhausted,
    /// Reached a node pinned by a cursor
    Pinned,
    /// The time budget ran out
    Budget,
}

/// Outcome of a purge pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    pub reclaimed: usize,
    pub halt: PurgeHalt,
}

impl<T> PendingQueue<T> {
    /// Unlink every reclaimable element ahead of the earliest cursor
    pub fn purge<F>(&self, reclaimable: F) -> QueueResult<PurgeReport>
    where
        F: FnMut(&T) -> bool,
    {
        self.purge_pass(reclaimable, || false)
    }

    /// Like [`purge`](Self::purge), but gives up once `max_duration` has elapsed
    pub fn purge_within<F>(&self, reclaimable: F, max_duration: Duration) -> QueueResult<PurgeReport>
    where
        F: FnMut(&T) -> bool,
    {
        self.purge_with_clock(reclaimable, max_duration, &SystemTimeProvider)
    }

    /// Time-budgeted purge measured against an explicit clock
    pub fn purge_with_clock<F>(
        &self,
        reclaimable: F,
        max_duration: Duration,
        clock: &dyn TimeProvider,
    ) -> QueueResult<PurgeReport>
    where
        F: FnMut(&T) -> bool,
    {
        let budget = Budget::start(clock, max_duration);
        self.purge_pass(reclaimable, || budget.exceeded())
    }

    fn purge_pass<F, B>(&self, mut reclaimable: F, exhausted: B) -> QueueResult<PurgeReport>
    where
        F: FnMut(&T) -> bool,
        B: Fn() -> bool,
    {
        let mut lock = self.fully_lock()?;
        let mut pred = Arc::clone(&lock.take.head);
        let mut reclaimed = 0;

        let halt = loop {
            // A stranded cursor rejoins at the head on its next advance
            if self.has_detached_pins() || pred.pins() > 0 {
                break PurgeHalt::Pinned;
            }
            let Some(node) = pred.next() else {
                break PurgeHalt::Exhausted;
            };
            if node.pins() > 0 {
                break PurgeHalt::Pinned;
            }
            if exhausted() {
                break PurgeHalt::Budget;
            }
            let matches = node.slot().item.as_ref().is_some_and(&mut reclaimable);
            if matches {
                self.unlink(&mut lock, &node, &pred);
                reclaimed += 1;
            } else {
                pred = node;
            }
        };

        if reclaimed > 0 {
            log::trace!("purge reclaimed {reclaimed} element(s), stopped: {halt}");
        }
        Ok(PurgeReport { reclaimed, halt })
    }
}
