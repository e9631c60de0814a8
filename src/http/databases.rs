//! Database CRUD. Thin wrappers over the request layer; the transaction
//! core does not depend on these.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::http::client::Client;
use crate::http::documents::Resource;
use crate::http::links::{db_link, dbs_link};
use reqwest::Method;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(rename = "_colls", default, skip_serializing_if = "String::is_empty")]
    pub colls: String,
    #[serde(rename = "_users", default, skip_serializing_if = "String::is_empty")]
    pub users: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Databases {
    #[serde(rename = "_rid", default)]
    pub rid: String,
    #[serde(rename = "_count", default)]
    pub count: i32,
    #[serde(rename = "Databases", default)]
    pub databases: Vec<Database>,
}

#[derive(Serialize)]
struct CreateDatabaseBody<'a> {
    id: &'a str,
}

impl Client {
    /// See <https://docs.microsoft.com/en-us/rest/api/cosmos-db/create-a-database>.
    pub async fn create_database(
        &self,
        db_name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<Database, Error> {
        let body = serde_json::to_vec(&CreateDatabaseBody { id: db_name })?;
        let response = self
            .call(Method::POST, &dbs_link(), Some(body), Default::default(), cancel)
            .await?;
        response.check()?;
        response.json()
    }

    pub async fn get_database(
        &self,
        db_name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<Database, Error> {
        let response = self
            .call(Method::GET, &db_link(db_name), None, Default::default(), cancel)
            .await?;
        response.check()?;
        response.json()
    }

    pub async fn list_databases(
        &self,
        cancel: Option<CancellationToken>,
    ) -> Result<Databases, Error> {
        let response = self
            .call(Method::GET, &dbs_link(), None, Default::default(), cancel)
            .await?;
        response.check()?;
        response.json()
    }

    pub async fn delete_database(
        &self,
        db_name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let response = self
            .call(Method::DELETE, &db_link(db_name), None, Default::default(), cancel)
            .await?;
        response.check()
    }
}
