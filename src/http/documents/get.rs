use std::collections::HashMap;

use crate::error::Error;
use crate::http::documents::ConsistencyLevel;
use crate::http::partition_key::PartitionKeyValue;
use crate::http::{
    HEADER_CONSISTENCY_LEVEL, HEADER_IF_NONE_MATCH, HEADER_PARTITION_KEY, HEADER_SESSION_TOKEN,
};

/// Options for reading a single document.
#[derive(Debug, Clone, Default)]
pub struct GetDocumentOptions {
    pub if_none_match: Option<String>,
    pub partition_key_value: Option<PartitionKeyValue>,
    pub consistency_level: Option<ConsistencyLevel>,
    pub session_token: Option<String>,
}

impl GetDocumentOptions {
    pub(crate) fn as_headers(&self) -> Result<HashMap<&'static str, String>, Error> {
        let mut headers = HashMap::new();

        if let Some(etag) = &self.if_none_match {
            headers.insert(HEADER_IF_NONE_MATCH, etag.clone());
        }

        if let Some(pk) = &self.partition_key_value {
            headers.insert(HEADER_PARTITION_KEY, pk.header_value());
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
