//! Dead-letter envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A payload that could not be delivered, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DlqMessage {
    pub data: Value,
    pub error: String,
}

impl DlqMessage {
    pub fn new(data: Value, error: impl Into<String>) -> Self {
        Self {
            data,
            error: error.into(),
        }
    }
}
