//! Shared helpers for integration tests

use auditrelay::relay::{ProcessError, ProcessResult, Processor, RecordSource};
use serde_json::Value;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One JSON line per record, `partitions` partitions interleaved
pub fn jsonl_records(partitions: i32, per_partition: i64) -> String {
    let mut lines = String::new();
    for offset in 0..per_partition {
        for partition in 0..partitions {
            lines.push_str(&format!(
                "{{\"partition\":{partition},\"offset\":{offset},\"key\":\"k-{partition}-{offset}\",\"value\":{{\"type\":\"request\",\"partition\":{partition},\"offset\":{offset}}}}}\n"
            ));
        }
    }
    lines
}

pub fn source_from(text: String) -> RecordSource {
    RecordSource::from_reader("memory", Cursor::new(text.into_bytes()))
}

/// Processor that records every payload and rejects offsets divisible by `reject_every`
pub struct RecordingProcessor {
    pub reject_every: i64,
    pub seen: Mutex<Vec<Value>>,
    pub calls: AtomicUsize,
}

impl RecordingProcessor {
    pub fn new(reject_every: i64) -> Self {
        Self {
            reject_every,
            seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Processor for RecordingProcessor {
    fn process(&self, payload: &Value) -> ProcessResult<()> {
        self.calls.fetch_add(1, Ordering::AcqRel);
        self.seen.lock().unwrap().push(payload.clone());
        let offset = payload["offset"].as_i64().unwrap_or(0);
        if self.reject_every > 0 && offset % self.reject_every == 0 {
            return Err(ProcessError::Client {
                status: 422,
                message: "Unprocessable Entity".to_string(),
            });
        }
        Ok(())
    }
}
