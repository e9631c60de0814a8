//! Collection CRUD. Thin wrappers over the request layer; the transaction
//! core does not depend on these.

use std::collections::HashMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::http::client::Client;
use crate::http::documents::Resource;
use crate::http::links::{coll_link, colls_link};
use crate::http::{
    HEADER_CONTINUATION, HEADER_MAX_ITEM_COUNT, HEADER_OFFER_THROUGHPUT, HEADER_OFFER_TYPE,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(rename = "indexingPolicy", default, skip_serializing_if = "Option::is_none")]
    pub indexing_policy: Option<IndexingPolicy>,
    #[serde(rename = "partitionKey", default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<PartitionKeyDefinition>,
    #[serde(rename = "_docs", default, skip_serializing_if = "String::is_empty")]
    pub docs: String,
    #[serde(rename = "_sprocs", default, skip_serializing_if = "String::is_empty")]
    pub sprocs: String,
    #[serde(rename = "_triggers", default, skip_serializing_if = "String::is_empty")]
    pub triggers: String,
    #[serde(rename = "_conflicts", default, skip_serializing_if = "String::is_empty")]
    pub conflicts: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Collections {
    #[serde(rename = "_rid", default)]
    pub rid: String,
    #[serde(rename = "_count", default)]
    pub count: i32,
    #[serde(rename = "DocumentCollections", default)]
    pub collections: Vec<Collection>,
}

/// The partition key definition of a collection, e.g.
/// `{"paths": ["/userId"], "kind": "Hash"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionKeyDefinition {
    pub paths: Vec<String>,
    pub kind: String,
}

impl PartitionKeyDefinition {
    /// A hash partition key over one document field, named without the
    /// leading slash.
    pub fn hash(field: &str) -> PartitionKeyDefinition {
        PartitionKeyDefinition {
            paths: vec![format!("/{field}")],
            kind: "Hash".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexingPolicy {
    #[serde(rename = "indexingMode", default, skip_serializing_if = "String::is_empty")]
    pub indexing_mode: String,
    #[serde(default)]
    pub automatic: bool,
    #[serde(rename = "includedPaths", default, skip_serializing_if = "Vec::is_empty")]
    pub included_paths: Vec<IncludedPath>,
    #[serde(rename = "excludedPaths", default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_paths: Vec<ExcludedPath>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludedPath {
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<Index>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludedPath {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Index {
    #[serde(rename = "dataType", default, skip_serializing_if = "String::is_empty")]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub precision: i32,
}

fn is_zero(precision: &i32) -> bool {
    *precision == 0
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateCollectionOptions {
    pub id: String,
    #[serde(rename = "indexingPolicy", skip_serializing_if = "Option::is_none")]
    pub indexing_policy: Option<IndexingPolicy>,
    #[serde(rename = "partitionKey", skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<PartitionKeyDefinition>,
    /// RUs, 400 to 250000. Do not combine with `offer_type`.
    #[serde(skip_serializing)]
    pub offer_throughput: Option<i32>,
    /// S1, S2, S3. Do not combine with `offer_throughput`.
    #[serde(skip_serializing)]
    pub offer_type: Option<String>,
    #[serde(rename = "defaultTtl", skip_serializing_if = "Option::is_none")]
    pub default_time_to_live: Option<i32>,
}

impl CreateCollectionOptions {
    fn as_headers(&self) -> Result<HashMap<&'static str, String>, Error> {
        let mut headers = HashMap::new();
        if let Some(throughput) = self.offer_throughput {
            if throughput >= 10000 && self.partition_key.is_none() {
                return Err(Error::ThroughputRequiresPartitionKey);
            }
            headers.insert(HEADER_OFFER_THROUGHPUT, throughput.to_string());
        }
        if let Some(offer_type) = &self.offer_type {
            headers.insert(HEADER_OFFER_TYPE, offer_type.clone());
        }
        Ok(headers)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplaceCollectionOptions {
    pub id: String,
    #[serde(rename = "indexingPolicy", skip_serializing_if = "Option::is_none")]
    pub indexing_policy: Option<IndexingPolicy>,
    #[serde(rename = "partitionKey", skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<PartitionKeyDefinition>,
    #[serde(rename = "defaultTtl", skip_serializing_if = "Option::is_none")]
    pub default_time_to_live: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct ListCollectionsOptions {
    pub max_item_count: Option<i32>,
    pub continuation: Option<String>,
}

/// The decoded collection listing plus its paging metadata.
#[derive(Debug, Clone, Default)]
pub struct ListCollectionsResponse {
    pub collections: Collections,
    pub continuation: Option<String>,
    pub request_charge: f64,
}

impl Client {
    /// See <https://docs.microsoft.com/en-us/rest/api/cosmos-db/create-a-collection>.
    pub async fn create_collection(
        &self,
        db_name: &str,
        options: &CreateCollectionOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<Collection, Error> {
        let headers = options.as_headers()?;
        let body = serde_json::to_vec(options)?;
        let response = self
            .call(Method::POST, &colls_link(db_name), Some(body), headers, cancel)
            .await?;
        response.check()?;
        response.json()
    }

    pub async fn get_collection(
        &self,
        db_name: &str,
        coll_name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<Collection, Error> {
        let response = self
            .call(
                Method::GET,
                &coll_link(db_name, coll_name),
                None,
                Default::default(),
                cancel,
            )
            .await?;
        response.check()?;
        response.json()
    }

    pub async fn list_collections(
        &self,
        db_name: &str,
        options: &ListCollectionsOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<ListCollectionsResponse, Error> {
        let mut headers = HashMap::new();
        if let Some(count) = options.max_item_count {
            headers.insert(HEADER_MAX_ITEM_COUNT, count.to_string());
        }
        if let Some(continuation) = &options.continuation {
            if !continuation.is_empty() {
                headers.insert(HEADER_CONTINUATION, continuation.clone());
            }
        }
        let response = self
            .call(Method::GET, &colls_link(db_name), None, headers, cancel)
            .await?;
        response.check()?;
        Ok(ListCollectionsResponse {
            collections: response.json()?,
            continuation: response.meta.continuation.clone(),
            request_charge: response.meta.request_charge,
        })
    }

    /// See <https://docs.microsoft.com/en-us/rest/api/cosmos-db/replace-a-collection>.
    pub async fn replace_collection(
        &self,
        db_name: &str,
        options: &ReplaceCollectionOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<Collection, Error> {
        let body = serde_json::to_vec(options)?;
        let response = self
            .call(
                Method::PUT,
                &coll_link(db_name, &options.id),
                Some(body),
                Default::default(),
                cancel,
            )
            .await?;
        response.check()?;
        response.json()
    }

    pub async fn delete_collection(
        &self,
        db_name: &str,
        coll_name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let response = self
            .call(
                Method::DELETE,
                &coll_link(db_name, coll_name),
                None,
                Default::default(),
                cancel,
            )
            .await?;
        response.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn high_throughput_requires_partition_key() {
        let options = CreateCollectionOptions {
            id: "c".to_string(),
            offer_throughput: Some(10000),
            ..Default::default()
        };
        assert_eq!(
            options.as_headers().unwrap_err().kind(),
            ErrorKind::InvalidRequest
        );

        let options = CreateCollectionOptions {
            id: "c".to_string(),
            offer_throughput: Some(10000),
            partition_key: Some(PartitionKeyDefinition::hash("userId")),
            ..Default::default()
        };
        let headers = options.as_headers().unwrap();
        assert_eq!(headers.get(HEADER_OFFER_THROUGHPUT).unwrap(), "10000");
    }
}
