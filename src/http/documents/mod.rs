//! Document resources and the per-operation option structs.

pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod query;
pub mod replace;

use serde::{Deserialize, Serialize};

use crate::http::client::ResponseMeta;

/// The base metadata every persisted resource carries.
///
/// `id` is unique only within its partition key value; `rid` is globally
/// unique but assigned by the server. The etag is the sole
/// concurrency-control handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "_self", default, skip_serializing_if = "String::is_empty")]
    pub self_link: String,
    #[serde(rename = "_etag", default, skip_serializing_if = "String::is_empty")]
    pub etag: String,
    #[serde(rename = "_rid", default, skip_serializing_if = "String::is_empty")]
    pub rid: String,
    #[serde(rename = "_ts", default, skip_serializing_if = "ts_is_zero")]
    pub ts: i64,
}

fn ts_is_zero(ts: &i64) -> bool {
    *ts == 0
}

/// A raw document as the service returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub attachments: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyLevel {
    Strong,
    Bounded,
    Session,
    Eventual,
}

impl ConsistencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLevel::Strong => "Strong",
            ConsistencyLevel::Bounded => "Bounded",
            ConsistencyLevel::Session => "Session",
            ConsistencyLevel::Eventual => "Eventual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexingDirective {
    Include,
    Exclude,
}

impl IndexingDirective {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexingDirective::Include => "include",
            IndexingDirective::Exclude => "exclude",
        }
    }
}

/// Per-call response metadata for document operations.
#[derive(Debug, Clone, Default)]
pub struct DocumentResponse {
    /// The request charge in RUs.
    pub request_charge: f64,
    /// The session token returned by the service, when present.
    pub session_token: Option<String>,
}

impl DocumentResponse {
    pub(crate) fn from_meta(meta: &ResponseMeta) -> DocumentResponse {
        DocumentResponse {
            request_charge: meta.request_charge,
            session_token: meta.session_token.clone(),
        }
    }
}
