//! Line-oriented record source and offset bookkeeping
//!
//! Stands in for a broker subscription: records are read as JSON lines from
//! a file or stdin, and acknowledging a record commits the next offset of
//! its partition in an [`OffsetLedger`].

use crate::core::sync::lock_or_recover;
use crate::relay::error::{RelayError, RelayResult};
use crate::relay::message::{Acknowledgment, InboundRecord};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Topic assigned to lines that do not name one
pub const DEFAULT_TOPIC: &str = "audit";

#[derive(Deserialize)]
struct SourceLine {
    topic: Option<String>,
    partition: Option<i32>,
    offset: Option<i64>,
    key: Option<String>,
    value: Value,
}

/// Reads [`InboundRecord`]s from JSON lines
///
/// Each line is `{"topic":..,"partition":..,"offset":..,"key":..,"value":{..}}`.
/// Only `value` is required: the topic defaults to [`DEFAULT_TOPIC`], the
/// partition to 0, and the offset to the next one in that partition.
pub struct RecordSource {
    name: String,
    input: Box<dyn BufRead + Send>,
    line_number: usize,
    next_offsets: BTreeMap<(String, i32), i64>,
}

impl RecordSource {
    /// Open a file, or stdin for `-`
    pub fn open(input: &str) -> RelayResult<Self> {
        if input == "-" {
            return Ok(Self::from_reader("stdin", BufReader::new(io::stdin())));
        }
        let file = File::open(Path::new(input)).map_err(|e| RelayError::Input {
            source_name: input.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::from_reader(input, BufReader::new(file)))
    }

    pub fn from_reader(name: &str, input: impl BufRead + Send + 'static) -> Self {
        Self {
            name: name.to_string(),
            input: Box::new(input),
            line_number: 0,
            next_offsets: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the next record, skipping blank and malformed lines
    pub fn next_record(&mut self) -> RelayResult<Option<InboundRecord>> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self.input.read_line(&mut line).map_err(|e| RelayError::Input {
                source_name: self.name.clone(),
                message: e.to_string(),
            })?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SourceLine>(&line) {
                Ok(parsed) => match self.to_record(parsed) {
                    Some(record) => return Ok(Some(record)),
                    None => log::warn!(
                        "{}:{}: skipping record whose offset leaves no next offset",
                        self.name,
                        self.line_number
                    ),
                },
                Err(e) => log::warn!(
                    "{}:{}: skipping malformed record: {e}",
                    self.name,
                    self.line_number
                ),
            }
        }
    }

    /// `None` when the offset is the last representable one and cannot be committed past
    fn to_record(&mut self, line: SourceLine) -> Option<InboundRecord> {
        let topic = line.topic.unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        let partition = line.partition.unwrap_or(0);
        let next = self.next_offsets.entry((topic.clone(), partition)).or_insert(0);
        let offset = line.offset.unwrap_or(*next);
        *next = offset.checked_add(1)?;

        Some(InboundRecord {
            topic,
            partition,
            offset,
            key: line.key,
            value: line.value,
        })
    }
}

impl Iterator for RecordSource {
    type Item = RelayResult<InboundRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Committed position per topic-partition
///
/// A commit stores `offset + 1`, the next record to read, as a broker would.
#[derive(Debug, Default)]
pub struct OffsetLedger {
    committed: Mutex<BTreeMap<(String, i32), i64>>,
}

impl OffsetLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record that everything before `next_offset` has been consumed
    pub fn commit(&self, topic: &str, partition: i32, next_offset: i64) {
        let mut committed = lock_or_recover(&self.committed);
        let entry = committed
            .entry((topic.to_string(), partition))
            .or_insert(next_offset);
        if next_offset < *entry {
            log::warn!(
                "Offset regression on {topic}/{partition}: committing {next_offset} after {entry}"
            );
        }
        *entry = next_offset;
        log::debug!("Committed {topic}/{partition} at {next_offset}");
    }

    pub fn committed(&self, topic: &str, partition: i32) -> Option<i64> {
        lock_or_recover(&self.committed)
            .get(&(topic.to_string(), partition))
            .copied()
    }

    /// All committed positions, ordered by topic and partition
    pub fn snapshot(&self) -> Vec<(String, i32, i64)> {
        lock_or_recover(&self.committed)
            .iter()
            .map(|((topic, partition), offset)| (topic.clone(), *partition, *offset))
            .collect()
    }

    /// Acknowledgment that commits `record`'s offset when fired
    pub fn acknowledgment_for(self: &Arc<Self>, record: &InboundRecord) -> impl Acknowledgment {
        let ledger = Arc::clone(self);
        let topic = record.topic.clone();
        let partition = record.partition;
        let next_offset = record.offset.saturating_add(1);
        move || ledger.commit(&topic, partition, next_offset)
    }
}
