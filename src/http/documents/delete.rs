use std::collections::HashMap;

use crate::error::Error;
use crate::http::partition_key::PartitionKeyValue;
use crate::http::{HEADER_PARTITION_KEY, HEADER_TRIGGER_POST_INCLUDE, HEADER_TRIGGER_PRE_INCLUDE};

/// Options for deleting a document.
#[derive(Debug, Clone, Default)]
pub struct DeleteDocumentOptions {
    pub partition_key_value: Option<PartitionKeyValue>,
    pub pre_trigger_include: Vec<String>,
    pub post_trigger_include: Vec<String>,
}

impl DeleteDocumentOptions {
    pub(crate) fn as_headers(&self) -> Result<HashMap<&'static str, String>, Error> {
        let mut headers = HashMap::new();

        if let Some(pk) = &self.partition_key_value {
            headers.insert(HEADER_PARTITION_KEY, pk.header_value());
        }

        if !self.pre_trigger_include.is_empty() {
            headers.insert(HEADER_TRIGGER_PRE_INCLUDE, self.pre_trigger_include.join(","));
        }

        if !self.post_trigger_include.is_empty() {
            headers.insert(HEADER_TRIGGER_POST_INCLUDE, self.post_trigger_include.join(","));
        }

        Ok(headers)
    }
}
