//! Relayed messages and their acknowledgment state

use crate::core::sync::lock_or_recover;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A record as delivered by the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: Value,
}

impl InboundRecord {
    pub fn same_partition(&self, other: &InboundRecord) -> bool {
        self.partition == other.partition && self.topic == other.topic
    }
}

/// Broker-side acknowledgment for one record
///
/// Any `Fn()` closure is an acknowledgment.
pub trait Acknowledgment: Send + Sync {
    fn acknowledge(&self);
}

impl<F> Acknowledgment for F
where
    F: Fn() + Send + Sync,
{
    fn acknowledge(&self) {
        self()
    }
}

/// A queued record together with its processing and acknowledgment state
///
/// Both flags only ever go from `false` to `true`. The broker callback runs
/// at most once, and only after the message has been marked processed.
pub struct RelayMessage {
    record: InboundRecord,
    ack: Box<dyn Acknowledgment>,
    processed: AtomicBool,
    acknowledged: AtomicBool,
    ack_lock: Mutex<()>,
}

impl RelayMessage {
    pub fn new(record: InboundRecord, ack: impl Acknowledgment + 'static) -> Self {
        Self {
            record,
            ack: Box::new(ack),
            processed: AtomicBool::new(false),
            acknowledged: AtomicBool::new(false),
            ack_lock: Mutex::new(()),
        }
    }

    pub fn record(&self) -> &InboundRecord {
        &self.record
    }

    pub fn mark_processed(&self) {
        self.processed.store(true, Ordering::Release);
    }

    pub fn is_processed(&self) -> bool {
        self.processed.load(Ordering::Acquire)
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged.load(Ordering::Acquire)
    }

    /// Fire the broker acknowledgment if processed and not yet acknowledged
    ///
    /// Returns `true` only for the call that actually ran the callback.
    pub fn acknowledge(&self) -> bool {
        if !self.is_processed() || self.is_acknowledged() {
            return false;
        }
        let _guard = lock_or_recover(&self.ack_lock);
        if self.is_acknowledged() {
            return false;
        }
        self.ack.acknowledge();
        self.acknowledged.store(true, Ordering::Release);
        true
    }
}

impl fmt::Debug for RelayMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayMessage")
            .field("topic", &self.record.topic)
            .field("partition", &self.record.partition)
            .field("offset", &self.record.offset)
            .field("processed", &self.is_processed())
            .field("acknowledged", &self.is_acknowledged())
            .finish()
    }
}
