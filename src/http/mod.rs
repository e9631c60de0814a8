//! Low-level wrapper around the Cosmos DB REST API.
//!
//! Everything in here maps one-to-one onto the wire protocol: signed
//! requests, per-operation header maps, response metadata. The opinionated
//! session and transaction machinery lives at the crate root and is built on
//! top of this module.

pub mod auth;
pub mod client;
pub mod collections;
pub mod databases;
pub mod documents;
pub mod links;
pub mod offers;
pub mod partition_key;
pub mod partition_key_ranges;
pub mod sprocs;
pub mod triggers;

pub use tokio_util::sync::CancellationToken;

/// The REST API version sent with every request.
pub const API_VERSION: &str = "2018-12-31";

/// The content type the service requires for document queries.
pub const QUERY_CONTENT_TYPE: &str = "application/query+json";

/// `A-IM` header value selecting incremental feed (aka change feed) mode.
pub const INCREMENTAL_FEED: &str = "Incremental feed";

// Request header names, with the casing Cosmos DB documents for them.
pub const HEADER_X_DATE: &str = "X-Ms-Date";
pub const HEADER_VERSION: &str = "X-Ms-Version";
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";
pub const HEADER_IF_MATCH: &str = "If-Match";
pub const HEADER_IF_NONE_MATCH: &str = "If-None-Match";
pub const HEADER_A_IM: &str = "A-IM";
pub const HEADER_SESSION_TOKEN: &str = "x-ms-session-token";
pub const HEADER_CONSISTENCY_LEVEL: &str = "x-ms-consistency-level";
pub const HEADER_CONTINUATION: &str = "x-ms-continuation";
pub const HEADER_MAX_ITEM_COUNT: &str = "x-ms-max-item-count";
pub const HEADER_REQUEST_CHARGE: &str = "x-ms-request-charge";
pub const HEADER_ETAG: &str = "etag";
pub const HEADER_PARTITION_KEY: &str = "x-ms-documentdb-partitionkey";
pub const HEADER_PARTITION_KEY_RANGE_ID: &str = "x-ms-documentdb-partitionkeyrangeid";
pub const HEADER_CROSS_PARTITION: &str = "x-ms-documentdb-query-enablecrosspartition";
pub const HEADER_IS_QUERY: &str = "x-ms-documentdb-isquery";
pub const HEADER_IS_UPSERT: &str = "x-ms-documentdb-is-upsert";
pub const HEADER_INDEXING_DIRECTIVE: &str = "x-ms-indexing-directive";
pub const HEADER_TRIGGER_PRE_INCLUDE: &str = "x-ms-documentdb-pre-trigger-include";
pub const HEADER_TRIGGER_PRE_EXCLUDE: &str = "x-ms-documentdb-pre-trigger-exclude";
pub const HEADER_TRIGGER_POST_INCLUDE: &str = "x-ms-documentdb-post-trigger-include";
pub const HEADER_TRIGGER_POST_EXCLUDE: &str = "x-ms-documentdb-post-trigger-exclude";
pub const HEADER_OFFER_THROUGHPUT: &str = "x-ms-offer-throughput";
pub const HEADER_OFFER_TYPE: &str = "x-ms-offer-type";
