//! Bounded Pending Queue Component
//!
//! A bounded, thread-safe FIFO built as a singly linked list with two lock
//! domains, independent forward cursors and an in-place purge that never
//! disturbs a cursor.
//!
//! # Overview
//!
//! - **Classic access**: blocking and timed insert, take and poll, like any
//!   bounded blocking queue
//! - **Cursors**: any number of readers, each with its own position and an
//!   optional filter, that see elements without removing them
//! - **Purge**: reclaims space held by elements the application is done with,
//!   but only ahead of the earliest cursor
//! - **Batched iteration**: weakly consistent traversal that locks once per
//!   batch of [`ITER_BATCH_SIZE`] elements
//!
//! # Architecture
//!
//! ```text
//!   take lock                                               put lock
//!  ┌────────┐                                              ┌────────┐
//!  │  head  │                                              │  tail  │
//!  └───┬────┘                                              └───┬────┘
//!      ▼                                                       ▼
//!  ┌───────┐   ┌───────┐   ┌───────┐   ┌───────┐   ┌───────┐   ┌───────┐
//!  │   ·   │──▶│   1   │──▶│   2   │──▶│   3   │──▶│   4   │──▶│   5   │
//!  └───────┘   └───────┘   └───────┘   └───────┘   └───────┘   └───────┘
//!  sentinel                    ▲                       ▲
//!                              │ pin                   │ pin
//!                         ┌────┴────┐             ┌────┴────┐
//!                         │Cursor A │             │Cursor B │
//!                         └─────────┘             └─────────┘
//!
//!  purge may unlink 1; it stops at 2, the first pinned node
//! ```
//!
//! # Example Usage
//!
//! ```rust
//! use auditrelay::queue::{PendingQueue, PurgeHalt};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), auditrelay::queue::QueueError> {
//! let queue = Arc::new(PendingQueue::new(8)?);
//! for n in 1..=5 {
//!     queue.add(n)?;
//! }
//!
//! let cursor = queue.cursor()?;
//! assert_eq!(cursor.next()?, 1);
//! assert_eq!(cursor.next()?, 2);
//!
//! // The cursor stands on 2, so only 1 can be reclaimed
//! let report = queue.purge(|_| true)?;
//! assert_eq!(report.reclaimed, 1);
//! assert_eq!(report.halt, PurgeHalt::Pinned);
//! assert_eq!(queue.to_vec()?, vec![2, 3, 4, 5]);
//! # Ok(())
//! # }
//! ```

pub mod api;
mod cursor;
mod error;
mod iter;
mod pending;
mod purge;

pub use cursor::Cursor;
pub use error::{QueueError, QueueResult};
pub use iter::{Iter, ITER_BATCH_SIZE};
pub use pending::PendingQueue;
pub use purge::{PurgeHalt, PurgeReport};

#[cfg(test)]
mod tests;
