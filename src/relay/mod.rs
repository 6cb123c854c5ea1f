//! Audit Relay Pipeline
//!
//! Moves broker records to the downstream consumer API through the bounded
//! [`PendingQueue`](crate::queue::PendingQueue), releasing broker
//! acknowledgments strictly in order per partition.
//!
//! # Architecture
//!
//! ```text
//!  RecordSource ──queue()──▶ ┌──────────────────────────────┐
//!   (ingest)                 │        MessageReader         │
//!                            │  PendingQueue + shared Cursor│
//!                            └───────┬───────────▲──────────┘
//!                               poll │           │ acknowledge_if_possible
//!                     ┌──────────────┼───────────┼──────────────┐
//!                     ▼              ▼           │              ▼
//!                 writer-1       writer-2        │          writer-N
//!                     │              │           │              │
//!                     └──── Processor (RestApiCaller) ──────────┘
//!                                    │ failure
//!                                    ▼
//!                             DeadLetterSink
//! ```
//!
//! A record leaves the queue only when a purge finds it acknowledged; the
//! reader purges whenever an insertion finds the queue full.

pub mod api;
mod caller;
mod dead_letter;
mod error;
mod gauge;
mod message;
mod reader;
mod source;
mod writer;

pub use caller::{
    classify_status, AuditPayload, Processor, RestApiCaller, REQUEST_PATH, RESPONSE_PATH,
};
pub use dead_letter::{DeadLetterSink, JsonlDeadLetterSink, LogDeadLetterSink};
pub use error::{
    DeadLetterError, DeadLetterResult, ProcessError, ProcessResult, RelayError, RelayResult,
};
pub use gauge::PendingGauge;
pub use message::{Acknowledgment, InboundRecord, RelayMessage};
pub use reader::{MessageReader, ReaderSettings};
pub use source::{OffsetLedger, RecordSource, DEFAULT_TOPIC};
pub use writer::{MessageWriter, WriterPool, WriterStats};

#[cfg(test)]
mod tests;
