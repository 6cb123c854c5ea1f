//! Request audit record

use crate::model::MultiMap;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cookie as sent by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpCookie {
    pub name: String,
    pub value: String,
}

/// An inbound HTTP request as observed by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAudit {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub query: MultiMap,
    #[serde(default)]
    pub headers: MultiMap,
    #[serde(default)]
    pub cookies: BTreeMap<String, Vec<HttpCookie>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub arrived: NaiveDateTime,
}
