//! Writer threads: poll, deliver, dead-letter, acknowledge

use crate::core::shutdown::ShutdownCoordinator;
use crate::model::DlqMessage;
use crate::relay::caller::Processor;
use crate::relay::dead_letter::DeadLetterSink;
use crate::relay::error::{ProcessError, RelayError, RelayResult};
use crate::relay::message::RelayMessage;
use crate::relay::reader::{is_closed_error, MessageReader};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Counters shared by all writers of a pool
#[derive(Debug, Default)]
pub struct WriterStats {
    processed: AtomicU64,
    dead_lettered: AtomicU64,
    acknowledged: AtomicU64,
}

impl WriterStats {
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Acquire)
    }

    pub fn dead_lettered(&self) -> u64 {
        self.dead_lettered.load(Ordering::Acquire)
    }

    pub fn acknowledged(&self) -> u64 {
        self.acknowledged.load(Ordering::Acquire)
    }
}

/// One writer loop
pub struct MessageWriter {
    reader: Arc<MessageReader>,
    processor: Arc<dyn Processor>,
    dead_letter: Arc<dyn DeadLetterSink>,
    poll_timeout: Duration,
    shutdown: ShutdownCoordinator,
    stats: Arc<WriterStats>,
}

impl MessageWriter {
    pub fn new(
        reader: Arc<MessageReader>,
        processor: Arc<dyn Processor>,
        dead_letter: Arc<dyn DeadLetterSink>,
        poll_timeout: Duration,
        shutdown: ShutdownCoordinator,
        stats: Arc<WriterStats>,
    ) -> Self {
        Self {
            reader,
            processor,
            dead_letter,
            poll_timeout,
            shutdown,
            stats,
        }
    }

    /// Run until shutdown is requested or the queue is closed
    pub fn run(&self) -> RelayResult<()> {
        while !self.shutdown.is_shutdown_requested() {
            let message = match self.reader.poll(self.poll_timeout) {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(error) if is_closed_error(&error) => break,
                Err(error) => return Err(error),
            };
            self.process(&message);
            let fired = self.reader.acknowledge_if_possible(&message)?;
            self.stats
                .acknowledged
                .fetch_add(fired as u64, Ordering::AcqRel);
        }
        log::debug!("Writer stopped");
        Ok(())
    }

    fn process(&self, message: &RelayMessage) {
        let record = message.record();
        log::info!(
            "Processing message for key {}",
            record.key.as_deref().unwrap_or("<none>")
        );

        let outcome = catch_unwind(AssertUnwindSafe(|| self.processor.process(&record.value)))
            .unwrap_or_else(|panic| Err(ProcessError::unexpected(panic_message(&*panic))));

        match outcome {
            Ok(()) => {}
            Err(error @ (ProcessError::Client { .. } | ProcessError::Server { .. })) => {
                self.send_dead_letter(message, &error);
            }
            Err(error) => {
                log::error!("Unexpected error: {error}");
                self.send_dead_letter(message, &error);
            }
        }

        message.mark_processed();
        self.stats.processed.fetch_add(1, Ordering::AcqRel);
    }

    fn send_dead_letter(&self, message: &RelayMessage, error: &ProcessError) {
        let record = message.record();
        let key = record.key.as_deref();
        log::info!(
            "Sending to DLQ message for key {}",
            key.unwrap_or("<none>")
        );
        let letter = DlqMessage::new(record.value.clone(), error.to_string());
        match self.dead_letter.send(key, &letter) {
            Ok(()) => {
                self.stats.dead_lettered.fetch_add(1, Ordering::AcqRel);
            }
            Err(e) => log::error!(
                "Dead letter for {}/{}@{} lost: {e}",
                record.topic,
                record.partition,
                record.offset
            ),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("Processor panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("Processor panicked: {message}")
    } else {
        "Processor panicked".to_string()
    }
}

/// A fixed set of named writer threads sharing one reader
pub struct WriterPool {
    handles: Vec<JoinHandle<RelayResult<()>>>,
    stats: Arc<WriterStats>,
}

impl WriterPool {
    /// Spawn `threads` writers named `writer-1` .. `writer-N`
    pub fn start(
        threads: usize,
        reader: Arc<MessageReader>,
        processor: Arc<dyn Processor>,
        dead_letter: Arc<dyn DeadLetterSink>,
        poll_timeout: Duration,
        shutdown: ShutdownCoordinator,
    ) -> RelayResult<Self> {
        if threads == 0 {
            return Err(RelayError::InvalidSetting {
                setting: "writer.threads".to_string(),
                message: "at least one writer thread is required".to_string(),
            });
        }

        let stats = Arc::new(WriterStats::default());
        let mut handles = Vec::with_capacity(threads);
        for n in 1..=threads {
            let name = format!("writer-{n}");
            let writer = MessageWriter::new(
                Arc::clone(&reader),
                Arc::clone(&processor),
                Arc::clone(&dead_letter),
                poll_timeout,
                shutdown.clone(),
                Arc::clone(&stats),
            );
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || writer.run())
                .map_err(|e| RelayError::WorkerSpawn {
                    name,
                    message: e.to_string(),
                })?;
            handles.push(handle);
        }
        log::info!("Started {threads} writer thread(s)");

        Ok(Self { handles, stats })
    }

    pub fn stats(&self) -> Arc<WriterStats> {
        Arc::clone(&self.stats)
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// True once every writer thread has exited
    pub fn is_stopped(&self) -> bool {
        self.handles.iter().all(|handle| handle.is_finished())
    }

    /// Wait for every writer, returning the first error any of them hit
    pub fn join(self) -> RelayResult<Arc<WriterStats>> {
        let mut first_error = None;
        for handle in self.handles {
            let name = handle.thread().name().unwrap_or("writer").to_string();
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    log::error!("{name} failed: {error}");
                    first_error.get_or_insert(error);
                }
                Err(_) => log::error!("{name} panicked"),
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(self.stats),
        }
    }
}
