use std::collections::HashMap;

use serde::Deserialize;

use crate::error::Error;
use crate::http::{
    HEADER_A_IM, HEADER_CONTINUATION, HEADER_IF_NONE_MATCH, HEADER_MAX_ITEM_COUNT,
    HEADER_PARTITION_KEY_RANGE_ID, INCREMENTAL_FEED,
};

/// Options for listing documents, either as a plain paged listing or as the
/// incremental feed (aka change feed) of a partition-key range.
#[derive(Debug, Clone, Default)]
pub struct ListDocumentsOptions {
    pub max_item_count: Option<i32>,
    /// Selects incremental feed mode (`A-IM: Incremental feed`). Combine
    /// with `if_none_match` and `partition_key_range_id`.
    pub incremental_feed: bool,
    pub continuation: Option<String>,
    pub if_none_match: Option<String>,
    pub partition_key_range_id: Option<String>,
}

impl ListDocumentsOptions {
    pub(crate) fn as_headers(&self) -> Result<HashMap<&'static str, String>, Error> {
        let mut headers = HashMap::new();

        if let Some(count) = self.max_item_count {
            headers.insert(HEADER_MAX_ITEM_COUNT, count.to_string());
        }

        if self.incremental_feed {
            headers.insert(HEADER_A_IM, INCREMENTAL_FEED.to_string());
        }

        if let Some(continuation) = &self.continuation {
            if !continuation.is_empty() {
                headers.insert(HEADER_CONTINUATION, continuation.clone());
            }
        }

        if let Some(etag) = &self.if_none_match {
            if !etag.is_empty() {
                headers.insert(HEADER_IF_NONE_MATCH, etag.clone());
            }
        }

        if let Some(range_id) = &self.partition_key_range_id {
            if !range_id.is_empty() {
                headers.insert(HEADER_PARTITION_KEY_RANGE_ID, range_id.clone());
            }
        }

        Ok(headers)
    }
}

/// The decoded result of a document listing.
///
/// In incremental feed mode a 304 sets `not_modified` and leaves
/// `documents` empty; the response still carries the etag to use for the
/// next read.
#[derive(Debug, Clone, Default)]
pub struct ListDocumentsResponse<T> {
    pub documents: Vec<T>,
    pub count: i32,
    pub request_charge: f64,
    pub session_token: Option<String>,
    pub continuation: Option<String>,
    pub etag: Option<String>,
    pub not_modified: bool,
}

#[derive(Deserialize)]
pub(crate) struct ListResponseBody<T> {
    #[serde(rename = "_count", default)]
    pub count: i32,
    #[serde(rename = "Documents", default = "Vec::new")]
    pub documents: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incremental_feed_headers() {
        let headers = ListDocumentsOptions {
            max_item_count: Some(10),
            incremental_feed: true,
            if_none_match: Some("etag-0".to_string()),
            partition_key_range_id: Some("7".to_string()),
            ..Default::default()
        }
        .as_headers()
        .unwrap();
        assert_eq!(headers.get(HEADER_A_IM).unwrap(), "Incremental feed");
        assert_eq!(headers.get(HEADER_IF_NONE_MATCH).unwrap(), "etag-0");
        assert_eq!(headers.get(HEADER_PARTITION_KEY_RANGE_ID).unwrap(), "7");
        assert_eq!(headers.get(HEADER_MAX_ITEM_COUNT).unwrap(), "10");
    }

    #[test]
    fn plain_listing_has_no_feed_headers() {
        let headers = ListDocumentsOptions {
            continuation: Some("token".to_string()),
            ..Default::default()
        }
        .as_headers()
        .unwrap();
        assert!(!headers.contains_key(HEADER_A_IM));
        assert_eq!(headers.get(HEADER_CONTINUATION).unwrap(), "token");
    }
}
