//! Downstream delivery of audit payloads

use crate::core::retry::{retry_blocking, RetryPolicy};
use crate::model::{RequestAudit, ResponseAudit};
use crate::relay::error::{ProcessError, ProcessResult};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const REQUEST_PATH: &str = "/api/v1/consume/request";
pub const RESPONSE_PATH: &str = "/api/v1/consume/response";

/// Handles one payload taken from the queue
pub trait Processor: Send + Sync {
    fn process(&self, payload: &Value) -> ProcessResult<()>;
}

/// Broker payload, discriminated by its `type` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuditPayload {
    Request(RequestAudit),
    Response(ResponseAudit),
}

impl AuditPayload {
    pub fn decode(payload: &Value) -> ProcessResult<Self> {
        if payload.is_null() {
            return Err(ProcessError::unexpected("Payload is null"));
        }
        Self::deserialize(payload)
            .map_err(|e| ProcessError::unexpected(format!("Payload type is not supported: {e}")))
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Request(_) => REQUEST_PATH,
            Self::Response(_) => RESPONSE_PATH,
        }
    }
}

/// Posts request and response audits to the consumer REST API
pub struct RestApiCaller {
    client: Client,
    base_uri: String,
    retry: RetryPolicy,
}

impl RestApiCaller {
    pub fn new(base_uri: &str, request_timeout: Duration, retry: RetryPolicy) -> ProcessResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProcessError::unexpected(format!("Cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_uri: base_uri.trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    fn post<B: Serialize>(&self, path: &str, body: &B) -> ProcessResult<()> {
        let url = format!("{}{}", self.base_uri, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| ProcessError::unexpected(format!("POST {url} failed: {e}")))?;
        classify_status(response.status())
    }
}

impl Processor for RestApiCaller {
    fn process(&self, payload: &Value) -> ProcessResult<()> {
        let audit = AuditPayload::decode(payload)?;
        let path = audit.path();
        retry_blocking(
            path,
            &self.retry,
            || match &audit {
                AuditPayload::Request(request) => self.post(path, request),
                AuditPayload::Response(response) => self.post(path, response),
            },
            ProcessError::is_transient,
        )
    }
}

/// Map a downstream status onto the delivery outcome
pub fn classify_status(status: StatusCode) -> ProcessResult<()> {
    let reason = status.canonical_reason().unwrap_or("").to_string();
    if status.is_client_error() {
        Err(ProcessError::Client {
            status: status.as_u16(),
            message: reason,
        })
    } else if status.is_server_error() {
        Err(ProcessError::Server {
            status: status.as_u16(),
            message: reason,
        })
    } else if status.is_success() {
        Ok(())
    } else {
        Err(ProcessError::unexpected(format!(
            "Unexpected status {}",
            status.as_u16()
        )))
    }
}
