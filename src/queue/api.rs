//! Public API for the queue system
//!
//! External modules should import from here rather than directly from internal modules.
//! See module documentation for complete usage examples and architecture details.

// Core queue components
pub use crate::queue::cursor::Cursor;
pub use crate::queue::pending::PendingQueue;

// Traversal and reclamation
pub use crate::queue::iter::{Iter, ITER_BATCH_SIZE};
pub use crate::queue::purge::{PurgeHalt, PurgeReport};

// Error handling
pub use crate::queue::error::{QueueError, QueueResult};
