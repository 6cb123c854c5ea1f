//! Audit payload model
//!
//! The JSON shapes relayed between the gateway, the broker and the
//! downstream consumer API. Field names on the wire follow the gateway's
//! conventions (`user_id`, `remote_addr`, camelCase cookie attributes) and
//! `arrived` is an ISO-8601 local date-time.

mod dlq;
mod request;
mod response;

pub use dlq::DlqMessage;
pub use request::{HttpCookie, RequestAudit};
pub use response::{ResponseAudit, ResponseCookie};

use std::collections::BTreeMap;

/// Multi-valued string map used for headers and query parameters
pub type MultiMap = BTreeMap<String, Vec<String>>;
