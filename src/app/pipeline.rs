//! One relay run: ingest a record source through the writer pool
//!
//! Records are fed into the [`MessageReader`] from an `ingest` thread while
//! the calling thread watches progress. The run ends when the input is
//! exhausted and every ingested record has been acknowledged, or when
//! shutdown is requested.

use crate::app::cli::RelayConfig;
use crate::core::shutdown::ShutdownCoordinator;
use crate::relay::{
    DeadLetterSink, MessageReader, OffsetLedger, Processor, RecordSource, RelayError,
    RelayResult, WriterPool,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const WATCH_INTERVAL: Duration = Duration::from_millis(50);
const GAUGE_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of a relay run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySummary {
    pub ingested: u64,
    pub processed: u64,
    pub dead_lettered: u64,
    pub acknowledged: u64,
    /// `(topic, partition, next offset)` for every partition seen
    pub committed: Vec<(String, i32, i64)>,
    pub interrupted: bool,
}

/// Relay every record of `source`, returning once it is drained or shutdown is requested
pub fn run_pipeline(
    config: &RelayConfig,
    source: RecordSource,
    processor: Arc<dyn Processor>,
    dead_letter: Arc<dyn DeadLetterSink>,
    shutdown: ShutdownCoordinator,
) -> RelayResult<RelaySummary> {
    let reader = Arc::new(MessageReader::new(&config.reader)?);
    let ledger = OffsetLedger::new();
    let pool = WriterPool::start(
        config.threads,
        Arc::clone(&reader),
        processor,
        dead_letter,
        config.poll_timeout,
        shutdown.clone(),
    )?;
    let stats = pool.stats();
    let gauge = reader.gauge();
    let ingested = Arc::new(AtomicU64::new(0));

    let source_name = source.name().to_string();
    let ingest = {
        let reader = Arc::clone(&reader);
        let ledger = Arc::clone(&ledger);
        let ingested = Arc::clone(&ingested);
        thread::Builder::new()
            .name("ingest".to_string())
            .spawn(move || ingest_records(source, &reader, &ledger, &ingested))
            .map_err(|e| RelayError::WorkerSpawn {
                name: "ingest".to_string(),
                message: e.to_string(),
            })
    };
    let ingest = match ingest {
        Ok(handle) => handle,
        Err(error) => return Err(abandon_run(&reader, pool, error)),
    };

    let mut last_report = Instant::now();
    let interrupted = loop {
        if shutdown.wait_timeout(WATCH_INTERVAL) {
            break true;
        }
        if last_report.elapsed() >= GAUGE_INTERVAL {
            log::debug!("{gauge}");
            last_report = Instant::now();
        }
        if ingest.is_finished() && stats.acknowledged() >= ingested.load(Ordering::Acquire)
        {
            break false;
        }
        if pool.is_stopped() {
            log::error!("All writers stopped before the input was relayed");
            break false;
        }
    };

    reader.close();
    let ingest_result = if ingest.is_finished() || !interrupted {
        match ingest.join() {
            Ok(result) => result.map(|_| ()),
            Err(_) => {
                log::error!("ingest thread panicked");
                Ok(())
            }
        }
    } else {
        // A blocking read of the input cannot be interrupted
        log::warn!("Abandoning input {source_name} while it is still being read");
        Ok(())
    };
    let stats = pool.join()?;
    ingest_result?;

    let summary = RelaySummary {
        ingested: ingested.load(Ordering::Acquire),
        processed: stats.processed(),
        dead_lettered: stats.dead_lettered(),
        acknowledged: stats.acknowledged(),
        committed: ledger.snapshot(),
        interrupted,
    };
    log::info!(
        "Relay {}: {} ingested, {} processed, {} dead-lettered, {} acknowledged",
        if interrupted { "interrupted" } else { "complete" },
        summary.ingested,
        summary.processed,
        summary.dead_lettered,
        summary.acknowledged
    );
    for (topic, partition, offset) in &summary.committed {
        log::info!("Committed {topic}/{partition} up to offset {offset}");
    }
    Ok(summary)
}

/// Stop the writers of a run that could not start, reporting `cause`
fn abandon_run(reader: &MessageReader, pool: WriterPool, cause: RelayError) -> RelayError {
    reader.close();
    if let Err(error) = pool.join() {
        log::error!("Writers failed while abandoning the run: {error}");
    }
    cause
}

fn ingest_records(
    source: RecordSource,
    reader: &MessageReader,
    ledger: &Arc<OffsetLedger>,
    ingested: &AtomicU64,
) -> RelayResult<u64> {
    let name = source.name().to_string();
    log::info!("Reading records from {name}");
    for record in source {
        let record = record?;
        log::debug!(
            "Consumed {}/{}@{} key {}",
            record.topic,
            record.partition,
            record.offset,
            record.key.as_deref().unwrap_or("<none>")
        );
        let ack = ledger.acknowledgment_for(&record);
        match reader.queue(record, ack) {
            Ok(_) => {
                ingested.fetch_add(1, Ordering::AcqRel);
            }
            Err(RelayError::Queue(crate::queue::QueueError::Closed)) => {
                log::info!("Stopped reading {name}: relay is shutting down");
                break;
            }
            Err(error) => return Err(error),
        }
    }
    let count = ingested.load(Ordering::Acquire);
    log::info!("Finished reading {name}: {count} record(s)");
    Ok(count)
}
