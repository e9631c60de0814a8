//! Stored-procedure CRUD and execution. Thin wrappers over the request
//! layer; the transaction core does not depend on these.

use std::collections::HashMap;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::http::client::Client;
use crate::http::documents::Resource;
use crate::http::links::{sproc_link, sprocs_link};
use crate::http::partition_key::PartitionKeyValue;
use crate::http::HEADER_PARTITION_KEY;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredProcedure {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoredProcedures {
    #[serde(rename = "_rid", default)]
    pub rid: String,
    #[serde(rename = "_count", default)]
    pub count: i32,
    #[serde(rename = "StoredProcedures", default)]
    pub stored_procedures: Vec<StoredProcedure>,
}

#[derive(Debug, Clone, Default)]
pub struct ExecuteStoredProcedureOptions {
    pub partition_key_value: Option<PartitionKeyValue>,
}

impl ExecuteStoredProcedureOptions {
    fn as_headers(&self) -> HashMap<&'static str, String> {
        let mut headers = HashMap::new();
        if let Some(pk) = &self.partition_key_value {
            headers.insert(HEADER_PARTITION_KEY, pk.header_value());
        }
        headers
    }
}

fn sproc_body(name: &str, body: &str) -> StoredProcedure {
    StoredProcedure {
        resource: Resource {
            id: name.to_string(),
            ..Default::default()
        },
        body: body.to_string(),
    }
}

impl Client {
    pub async fn create_stored_procedure(
        &self,
        db_name: &str,
        coll_name: &str,
        sproc_name: &str,
        body: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<StoredProcedure, Error> {
        let payload = serde_json::to_vec(&sproc_body(sproc_name, body))?;
        let response = self
            .call(
                Method::POST,
                &sprocs_link(db_name, coll_name),
                Some(payload),
                Default::default(),
                cancel,
            )
            .await?;
        response.check()?;
        response.json()
    }

    pub async fn replace_stored_procedure(
        &self,
        db_name: &str,
        coll_name: &str,
        sproc_name: &str,
        body: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<StoredProcedure, Error> {
        let payload = serde_json::to_vec(&sproc_body(sproc_name, body))?;
        let response = self
            .call(
                Method::PUT,
                &sproc_link(db_name, coll_name, sproc_name),
                Some(payload),
                Default::default(),
                cancel,
            )
            .await?;
        response.check()?;
        response.json()
    }

    pub async fn delete_stored_procedure(
        &self,
        db_name: &str,
        coll_name: &str,
        sproc_name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let response = self
            .call(
                Method::DELETE,
                &sproc_link(db_name, coll_name, sproc_name),
                None,
                Default::default(),
                cancel,
            )
            .await?;
        response.check()
    }

    pub async fn get_stored_procedure(
        &self,
        db_name: &str,
        coll_name: &str,
        sproc_name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<StoredProcedure, Error> {
        let response = self
            .call(
                Method::GET,
                &sproc_link(db_name, coll_name, sproc_name),
                None,
                Default::default(),
                cancel,
            )
            .await?;
        response.check()?;
        response.json()
    }

    pub async fn list_stored_procedures(
        &self,
        db_name: &str,
        coll_name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<StoredProcedures, Error> {
        let response = self
            .call(
                Method::GET,
                &sprocs_link(db_name, coll_name),
                None,
                Default::default(),
                cancel,
            )
            .await?;
        response.check()?;
        response.json()
    }

    /// Executes a stored procedure with the given JSON-serializable
    /// arguments, decoding its return value into `R`.
    pub async fn execute_stored_procedure<A: Serialize, R: DeserializeOwned>(
        &self,
        db_name: &str,
        coll_name: &str,
        sproc_name: &str,
        options: &ExecuteStoredProcedureOptions,
        args: &[A],
        cancel: Option<CancellationToken>,
    ) -> Result<R, Error> {
        let payload = serde_json::to_vec(args)?;
        let response = self
            .call(
                Method::POST,
                &sproc_link(db_name, coll_name, sproc_name),
                Some(payload),
                options.as_headers(),
                cancel,
            )
            .await?;
        response.check()?;
        response.json()
    }
}
