use std::collections::HashMap;

use crate::error::Error;
use crate::http::documents::IndexingDirective;
use crate::http::partition_key::PartitionKeyValue;
use crate::http::{
    HEADER_INDEXING_DIRECTIVE, HEADER_IS_UPSERT, HEADER_PARTITION_KEY,
    HEADER_TRIGGER_POST_INCLUDE, HEADER_TRIGGER_PRE_INCLUDE,
};

/// Options for creating a document.
///
/// With `is_upsert` the write is unconditional; without it the service
/// answers 409 when the id already exists in the partition.
#[derive(Debug, Clone, Default)]
pub struct CreateDocumentOptions {
    pub partition_key_value: Option<PartitionKeyValue>,
    pub is_upsert: bool,
    pub indexing_directive: Option<IndexingDirective>,
    pub pre_trigger_include: Vec<String>,
    pub post_trigger_include: Vec<String>,
}

impl CreateDocumentOptions {
    pub(crate) fn as_headers(&self) -> Result<HashMap<&'static str, String>, Error> {
        let mut headers = HashMap::new();

        if let Some(pk) = &self.partition_key_value {
            headers.insert(HEADER_PARTITION_KEY, pk.header_value());
        }

        headers.insert(HEADER_IS_UPSERT, self.is_upsert.to_string());

        if let Some(directive) = self.indexing_directive {
            headers.insert(HEADER_INDEXING_DIRECTIVE, directive.as_str().to_string());
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_header_is_always_present() {
        let headers = CreateDocumentOptions::default().as_headers().unwrap();
        assert_eq!(headers.get(HEADER_IS_UPSERT).unwrap(), "false");
        assert!(!headers.contains_key(HEADER_PARTITION_KEY));

        let headers = CreateDocumentOptions {
            partition_key_value: Some("alice".into()),
            is_upsert: true,
            ..Default::default()
        }
        .as_headers()
        .unwrap();
        assert_eq!(headers.get(HEADER_IS_UPSERT).unwrap(), "true");
        assert_eq!(headers.get(HEADER_PARTITION_KEY).unwrap(), r#"["alice"]"#);
    }
}
