use std::collections::HashMap;

use crate::error::Error;
use crate::http::documents::{ConsistencyLevel, IndexingDirective};
use crate::http::partition_key::PartitionKeyValue;
use crate::http::{
    HEADER_CONSISTENCY_LEVEL, HEADER_IF_MATCH, HEADER_INDEXING_DIRECTIVE, HEADER_PARTITION_KEY,
    HEADER_SESSION_TOKEN, HEADER_TRIGGER_POST_INCLUDE, HEADER_TRIGGER_PRE_INCLUDE,
};

/// Options for replacing a whole document.
///
/// With `if_match` the replace is a compare-and-swap: the service answers
/// 412 when the stored etag differs.
#[derive(Debug, Clone, Default)]
pub struct ReplaceDocumentOptions {
    pub partition_key_value: Option<PartitionKeyValue>,
    pub indexing_directive: Option<IndexingDirective>,
    pub pre_trigger_include: Vec<String>,
    pub post_trigger_include: Vec<String>,
    pub if_match: Option<String>,
    pub consistency_level: Option<ConsistencyLevel>,
    pub session_token: Option<String>,
}

impl ReplaceDocumentOptions {
    pub(crate) fn as_headers(&self) -> Result<HashMap<&'static str, String>, Error> {
        let mut headers = HashMap::new();

        if let Some(pk) = &self.partition_key_value {
            headers.insert(HEADER_PARTITION_KEY, pk.header_value());
        }

        if let Some(directive) = self.indexing_directive {
            headers.insert(HEADER_INDEXING_DIRECTIVE, directive.as_str().to_string());
        }

        if !self.pre_trigger_include.is_empty() {
            headers.insert(HEADER_TRIGGER_PRE_INCLUDE, self.pre_trigger_include.join(","));
        }

        if !self.post_trigger_include.is_empty() {
            headers.insert(HEADER_TRIGGER_POST_INCLUDE, self.post_trigger_include.join(","));
        }

        if let Some(etag) = &self.if_match {
            if !etag.is_empty() {
                headers.insert(HEADER_IF_MATCH, etag.clone());
            }
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
