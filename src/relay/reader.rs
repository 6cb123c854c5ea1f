//! Ingest side of the relay and the acknowledgment walk
//!
//! Records enter through [`MessageReader::queue`] in broker order. Writers
//! share one cursor to pull work, so each record is processed exactly once
//! while the record itself stays in the queue until it has been
//! acknowledged and purged. Acknowledgments are released in queue order per
//! partition, however the writers finish.

use crate::queue::{Cursor, PendingQueue};
use crate::relay::error::{RelayError, RelayResult};
use crate::relay::gauge::PendingGauge;
use crate::relay::message::{Acknowledgment, InboundRecord, RelayMessage};
use std::sync::Arc;
use std::time::Duration;

/// Settings for the ingest side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderSettings {
    /// Maximum number of records held in memory
    pub queue_size: usize,
    /// How long one insertion attempt waits for space
    pub queue_timeout: Duration,
    /// Time budget for one purge pass when the queue is full
    pub purge_time: Duration,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            queue_size: 10_000,
            queue_timeout: Duration::from_millis(250),
            purge_time: Duration::from_millis(50),
        }
    }
}

pub struct MessageReader {
    queue: Arc<PendingQueue<Arc<RelayMessage>>>,
    cursor: Cursor<Arc<RelayMessage>>,
    offer_timeout: Duration,
    max_purge_time: Duration,
}

impl MessageReader {
    pub fn new(settings: &ReaderSettings) -> RelayResult<Self> {
        let queue = Arc::new(PendingQueue::new(settings.queue_size)?);
        let cursor = queue.cursor()?;
        log::debug!(
            "Pending queue ready: capacity {}, offer timeout {:?}, purge budget {:?}",
            settings.queue_size,
            settings.queue_timeout,
            settings.purge_time
        );
        Ok(Self {
            queue,
            cursor,
            offer_timeout: settings.queue_timeout,
            max_purge_time: settings.purge_time,
        })
    }

    /// Place a record in the queue, waiting and purging until there is room
    ///
    /// Only returns once the record is queued, or with an error once the
    /// queue has been closed.
    pub fn queue(
        &self,
        record: InboundRecord,
        ack: impl Acknowledgment + 'static,
    ) -> RelayResult<Arc<RelayMessage>> {
        let message = Arc::new(RelayMessage::new(record, ack));
        loop {
            if self
                .queue
                .try_insert(Arc::clone(&message), self.offer_timeout)?
            {
                return Ok(message);
            }
            if self.queue.remaining_capacity() == 0 {
                let report = self
                    .queue
                    .purge_within(|m| m.is_acknowledged(), self.max_purge_time)?;
                log::debug!(
                    "Queue full; purged {} acknowledged message(s), stopped: {}",
                    report.reclaimed,
                    report.halt
                );
            }
        }
    }

    /// Next unprocessed message for a writer, waiting up to `timeout`
    pub fn poll(&self, timeout: Duration) -> RelayResult<Option<Arc<RelayMessage>>> {
        let message = self.cursor.next_timeout(timeout)?;
        if let Some(message) = &message {
            if message.record().key.is_none() {
                log::warn!(
                    "Processing a message without key ({}/{}@{})",
                    message.record().topic,
                    message.record().partition,
                    message.record().offset
                );
            }
        }
        Ok(message)
    }

    /// Acknowledge, in queue order, every processed message of `message`'s partition
    ///
    /// Walks from the head over messages of the same topic and partition,
    /// acknowledging each, and stops at the first one that is still
    /// unacknowledged. Returns the number of acknowledgments fired.
    pub fn acknowledge_if_possible(&self, message: &RelayMessage) -> RelayResult<usize> {
        let partition = message.record();
        let mut fired = 0;
        self.queue.for_each_until(
            |m| {
                if m.record().same_partition(partition) && m.acknowledge() {
                    fired += 1;
                }
            },
            |m| m.record().same_partition(partition) && !m.is_acknowledged(),
        )?;
        Ok(fired)
    }

    /// Number of messages held, acknowledged or not
    pub fn pending(&self) -> usize {
        self.queue.size()
    }

    pub fn gauge(&self) -> PendingGauge {
        PendingGauge::new(&self.queue)
    }

    /// Stop accepting records and wake every blocked writer
    pub fn close(&self) {
        self.queue.close();
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }
}

impl std::fmt::Debug for MessageReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageReader")
            .field("queue", &self.queue)
            .field("offer_timeout", &self.offer_timeout)
            .field("max_purge_time", &self.max_purge_time)
            .finish()
    }
}

/// Closed-queue errors are the normal way a writer learns to stop
pub(crate) fn is_closed_error(error: &RelayError) -> bool {
    matches!(error, RelayError::Queue(crate::queue::QueueError::Closed))
}
