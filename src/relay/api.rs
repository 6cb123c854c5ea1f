//! Public API for the relay pipeline
//!
//! External modules should import from here rather than directly from internal modules.

// Ingest and acknowledgment
pub use crate::relay::message::{Acknowledgment, InboundRecord, RelayMessage};
pub use crate::relay::reader::{MessageReader, ReaderSettings};
pub use crate::relay::source::{OffsetLedger, RecordSource};

// Writers and delivery
pub use crate::relay::caller::{AuditPayload, Processor, RestApiCaller};
pub use crate::relay::dead_letter::{DeadLetterSink, JsonlDeadLetterSink, LogDeadLetterSink};
pub use crate::relay::writer::{MessageWriter, WriterPool, WriterStats};

// Observability
pub use crate::relay::gauge::PendingGauge;

// Error handling
pub use crate::relay::error::{ProcessError, RelayError, RelayResult};
