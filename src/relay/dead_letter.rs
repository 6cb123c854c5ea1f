//! Dead-letter destinations for payloads that could not be delivered

use crate::model::DlqMessage;
use crate::relay::error::{DeadLetterError, DeadLetterResult};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Receives payloads the processor gave up on
pub trait DeadLetterSink: Send + Sync {
    fn send(&self, key: Option<&str>, message: &DlqMessage) -> DeadLetterResult<()>;
}

#[derive(Serialize)]
struct DeadLetterLine<'a> {
    key: Option<&'a str>,
    #[serde(flatten)]
    message: &'a DlqMessage,
}

/// Appends one JSON object per dead letter to a file
pub struct JsonlDeadLetterSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlDeadLetterSink {
    /// Open `path` for appending, creating it if needed
    pub fn open(path: impl AsRef<Path>) -> DeadLetterResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| DeadLetterError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> DeadLetterError {
        DeadLetterError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl DeadLetterSink for JsonlDeadLetterSink {
    fn send(&self, key: Option<&str>, message: &DlqMessage) -> DeadLetterResult<()> {
        let mut line = serde_json::to_vec(&DeadLetterLine { key, message })?;
        line.push(b'\n');

        let mut writer = crate::core::sync::lock_or_recover(&self.writer);
        writer.write_all(&line).map_err(|e| self.io_error(e))?;
        writer.flush().map_err(|e| self.io_error(e))
    }
}

/// Writes dead letters to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDeadLetterSink;

impl DeadLetterSink for LogDeadLetterSink {
    fn send(&self, key: Option<&str>, message: &DlqMessage) -> DeadLetterResult<()> {
        log::warn!(
            "Dead letter for key {}: {} ({})",
            key.unwrap_or("<none>"),
            message.error,
            serde_json::to_string(&message.data)?
        );
        Ok(())
    }
}
