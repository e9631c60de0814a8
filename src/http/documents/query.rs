use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::http::documents::ConsistencyLevel;
use crate::http::partition_key::PartitionKeyValue;
use crate::http::{
    HEADER_CONSISTENCY_LEVEL, HEADER_CONTENT_TYPE, HEADER_CONTINUATION, HEADER_CROSS_PARTITION,
    HEADER_IS_QUERY, HEADER_MAX_ITEM_COUNT, HEADER_PARTITION_KEY, HEADER_SESSION_TOKEN,
    QUERY_CONTENT_TYPE,
};

/// A SQL query with optional parameters.
#[derive(Debug, Clone, Serialize)]
pub struct Query {
    pub query: String,
    #[serde(rename = "parameters", skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<QueryParam>,
}

impl Query {
    pub fn new(query: impl Into<String>) -> Query {
        Query {
            query: query.into(),
            params: Vec::new(),
        }
    }

    /// Adds a named parameter; the name should contain a `@` character.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Query {
        self.params.push(QueryParam {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryParam {
    pub name: String,
    pub value: serde_json::Value,
}

/// Options for querying documents.
///
/// The service requires some non-obvious settings for queries; the
/// `Default` implementation gets them right.
#[derive(Debug, Clone)]
pub struct QueryDocumentsOptions {
    pub partition_key_value: Option<PartitionKeyValue>,
    pub is_query: bool,
    pub content_type: String,
    pub max_item_count: Option<i32>,
    pub continuation: Option<String>,
    pub enable_cross_partition: bool,
    pub consistency_level: Option<ConsistencyLevel>,
    pub session_token: Option<String>,
}

impl Default for QueryDocumentsOptions {
    fn default() -> Self {
        QueryDocumentsOptions {
            partition_key_value: None,
            is_query: true,
            content_type: QUERY_CONTENT_TYPE.to_string(),
            max_item_count: None,
            continuation: None,
            enable_cross_partition: false,
            consistency_level: None,
            session_token: None,
        }
    }
}

impl QueryDocumentsOptions {
    pub(crate) fn as_headers(&self) -> Result<HashMap<&'static str, String>, Error> {
        let mut headers = HashMap::new();

        if let Some(pk) = &self.partition_key_value {
            headers.insert(HEADER_PARTITION_KEY, pk.header_value());
        }

        headers.insert(HEADER_IS_QUERY, self.is_query.to_string());

        if self.content_type != QUERY_CONTENT_TYPE {
            return Err(Error::WrongQueryContentType);
        }
        headers.insert(HEADER_CONTENT_TYPE, self.content_type.clone());

        if let Some(count) = self.max_item_count {
            headers.insert(HEADER_MAX_ITEM_COUNT, count.to_string());
        }

        if let Some(continuation) = &self.continuation {
            if !continuation.is_empty() {
                headers.insert(HEADER_CONTINUATION, continuation.clone());
            }
        }

        if self.enable_cross_partition {
            headers.insert(HEADER_CROSS_PARTITION, "true".to_string());
        }

        if let Some(level) = self.consistency_level {
            headers.insert(HEADER_CONSISTENCY_LEVEL, level.as_str().to_string());
        }

        if let Some(token) = &self.session_token {
            if !token.is_empty() {
                headers.insert(HEADER_SESSION_TOKEN, token.clone());
            }
        }

        Ok(headers)
    }
}

/// The decoded result of a document query.
#[derive(Debug, Clone, Default)]
pub struct QueryDocumentsResponse<T> {
    pub documents: Vec<T>,
    pub count: i32,
    pub continuation: Option<String>,
    pub request_charge: f64,
    pub session_token: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponseBody<T> {
    #[serde(rename = "_count", default)]
    pub count: i32,
    #[serde(rename = "Documents", default = "Vec::new")]
    pub documents: Vec<T>,
}
