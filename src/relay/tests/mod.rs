//! Test modules for the relay pipeline

mod writer;

use crate::model::DlqMessage;
use crate::relay::caller::Processor;
use crate::relay::dead_letter::DeadLetterSink;
use crate::relay::error::{DeadLetterResult, ProcessResult};
use crate::relay::message::InboundRecord;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub(crate) fn record(partition: i32, offset: i64) -> InboundRecord {
    InboundRecord {
        topic: "audit".to_string(),
        partition,
        offset,
        key: Some(format!("key-{partition}-{offset}")),
        value: json!({"partition": partition, "offset": offset}),
    }
}

/// Processor backed by a closure
pub(crate) struct FnProcessor<F>(pub F);

impl<F> Processor for FnProcessor<F>
where
    F: Fn(&Value) -> ProcessResult<()> + Send + Sync,
{
    fn process(&self, payload: &Value) -> ProcessResult<()> {
        (self.0)(payload)
    }
}

/// Dead-letter sink that keeps everything in memory
#[derive(Default)]
pub(crate) struct MemorySink {
    pub letters: Mutex<Vec<(Option<String>, DlqMessage)>>,
}

impl DeadLetterSink for MemorySink {
    fn send(&self, key: Option<&str>, message: &DlqMessage) -> DeadLetterResult<()> {
        self.letters
            .lock()
            .unwrap()
            .push((key.map(str::to_string), message.clone()));
        Ok(())
    }
}

/// Acknowledgment log shared by many records
pub(crate) type AckLog = Arc<Mutex<Vec<(i32, i64)>>>;

pub(crate) fn ack_into(log: &AckLog, record: &InboundRecord) -> impl Fn() + Send + Sync + 'static {
    let log = Arc::clone(log);
    let entry = (record.partition, record.offset);
    move || log.lock().unwrap().push(entry)
}
