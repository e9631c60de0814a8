//! The [`Collection`] handle and the [`DocumentClient`] seam between the
//! session engine and the request layer.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::container::{next_session_slot, SessionContainer};
use crate::error::{Error, ErrorKind};
use crate::http::client::Client;
use crate::http::documents::create::CreateDocumentOptions;
use crate::http::documents::delete::DeleteDocumentOptions;
use crate::http::documents::get::GetDocumentOptions;
use crate::http::documents::list::{ListDocumentsOptions, ListDocumentsResponse};
use crate::http::documents::query::{Query, QueryDocumentsOptions, QueryDocumentsResponse};
use crate::http::documents::replace::ReplaceDocumentOptions;
use crate::http::documents::{ConsistencyLevel, DocumentResponse, Resource};
use crate::http::links::{doc_link, docs_link};
use crate::http::partition_key::PartitionKeyValue;
use crate::http::partition_key_ranges::PartitionKeyRangesResponse;
use crate::migration::post_get_hook;
use crate::model::{absent_entity, entity_info_value, BaseModel, CosmosEntity};
use crate::session::Session;

/// The document operations the session engine needs, over raw JSON
/// payloads. [`Client`] implements it against the live service; tests
/// substitute mocks.
///
/// Get and the write operations return the per-call metadata alongside the
/// result, because the session token on a failed response (a contended
/// write, say) is still valid and must reach the session.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    async fn get_document(
        &self,
        db_name: &str,
        coll_name: &str,
        id: &str,
        options: GetDocumentOptions,
        cancel: Option<CancellationToken>,
    ) -> (DocumentResponse, Result<Value, Error>);

    async fn create_document(
        &self,
        db_name: &str,
        coll_name: &str,
        document: &Value,
        options: CreateDocumentOptions,
        cancel: Option<CancellationToken>,
    ) -> (DocumentResponse, Result<Resource, Error>);

    async fn replace_document(
        &self,
        db_name: &str,
        coll_name: &str,
        id: &str,
        document: &Value,
        options: ReplaceDocumentOptions,
        cancel: Option<CancellationToken>,
    ) -> (DocumentResponse, Result<Resource, Error>);

    async fn delete_document(
        &self,
        db_name: &str,
        coll_name: &str,
        id: &str,
        options: DeleteDocumentOptions,
        cancel: Option<CancellationToken>,
    ) -> (DocumentResponse, Result<(), Error>);

    async fn query_documents(
        &self,
        db_name: &str,
        coll_name: &str,
        query: Query,
        options: QueryDocumentsOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<QueryDocumentsResponse<Value>, Error>;

    async fn list_documents(
        &self,
        db_name: &str,
        coll_name: &str,
        options: ListDocumentsOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<ListDocumentsResponse<Value>, Error>;

    async fn partition_key_ranges(
        &self,
        db_name: &str,
        coll_name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<PartitionKeyRangesResponse, Error>;
}

#[async_trait]
impl DocumentClient for Client {
    async fn get_document(
        &self,
        db_name: &str,
        coll_name: &str,
        id: &str,
        options: GetDocumentOptions,
        cancel: Option<CancellationToken>,
    ) -> (DocumentResponse, Result<Value, Error>) {
        let (parsed, result) = self
            .document_exchange(
                Method::GET,
                doc_link(db_name, coll_name, id),
                None,
                options.as_headers(),
                cancel,
            )
            .await;
        (parsed, result.and_then(|response| response.json()))
    }

    async fn create_document(
        &self,
        db_name: &str,
        coll_name: &str,
        document: &Value,
        options: CreateDocumentOptions,
        cancel: Option<CancellationToken>,
    ) -> (DocumentResponse, Result<Resource, Error>) {
        let body = match serde_json::to_vec(document) {
            Ok(body) => body,
            Err(e) => return (DocumentResponse::default(), Err(e.into())),
        };
        let (parsed, result) = self
            .document_exchange(
                Method::POST,
                docs_link(db_name, coll_name),
                Some(body),
                options.as_headers(),
                cancel,
            )
            .await;
        (parsed, result.and_then(|response| response.json()))
    }

    async fn replace_document(
        &self,
        db_name: &str,
        coll_name: &str,
        id: &str,
        document: &Value,
        options: ReplaceDocumentOptions,
        cancel: Option<CancellationToken>,
    ) -> (DocumentResponse, Result<Resource, Error>) {
        let body = match serde_json::to_vec(document) {
            Ok(body) => body,
            Err(e) => return (DocumentResponse::default(), Err(e.into())),
        };
        let (parsed, result) = self
            .document_exchange(
                Method::PUT,
                doc_link(db_name, coll_name, id),
                Some(body),
                options.as_headers(),
                cancel,
            )
            .await;
        (parsed, result.and_then(|response| response.json()))
    }

    async fn delete_document(
        &self,
        db_name: &str,
        coll_name: &str,
        id: &str,
        options: DeleteDocumentOptions,
        cancel: Option<CancellationToken>,
    ) -> (DocumentResponse, Result<(), Error>) {
        let (parsed, result) = self
            .document_exchange(
                Method::DELETE,
                doc_link(db_name, coll_name, id),
                None,
                options.as_headers(),
                cancel,
            )
            .await;
        (parsed, result.map(|_| ()))
    }

    async fn query_documents(
        &self,
        db_name: &str,
        coll_name: &str,
        query: Query,
        options: QueryDocumentsOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<QueryDocumentsResponse<Value>, Error> {
        Client::query_documents(self, db_name, coll_name, &query, &options, cancel).await
    }

    async fn list_documents(
        &self,
        db_name: &str,
        coll_name: &str,
        options: ListDocumentsOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<ListDocumentsResponse<Value>, Error> {
        Client::list_documents(self, db_name, coll_name, &options, cancel).await
    }

    async fn partition_key_ranges(
        &self,
        db_name: &str,
        coll_name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<PartitionKeyRangesResponse, Error> {
        self.get_partition_key_ranges(db_name, coll_name, cancel).await
    }
}

/// A handle to one collection: the lower-level client plus the collection's
/// configuration. Immutable after construction and therefore safe to share
/// between tasks.
#[derive(Clone)]
pub struct Collection {
    pub(crate) client: Arc<dyn DocumentClient>,
    pub(crate) db_name: String,
    pub(crate) name: String,
    pub(crate) partition_key: String,
    pub(crate) cancel: Option<CancellationToken>,
    pub(crate) slot: usize,
}

impl Collection {
    pub fn new(
        client: Arc<dyn DocumentClient>,
        db_name: impl Into<String>,
        name: impl Into<String>,
        partition_key: impl Into<String>,
    ) -> Collection {
        Collection {
            client,
            db_name: db_name.into(),
            name: name.into(),
            partition_key: partition_key.into(),
            cancel: None,
            slot: 0,
        }
    }

    /// Attaches a cancellation token used by every operation on this handle
    /// (sessions derived from it inherit the token).
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Collection {
        self.cancel = Some(cancel);
        self
    }

    /// Registers the collection for use with [`SessionContainer`]. Assigns
    /// a process-wide slot index on first call; further calls are no-ops.
    pub fn register(mut self) -> Collection {
        if self.slot == 0 {
            self.slot = next_session_slot();
        }
        self
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    /// Starts a fresh session with an empty token and cache.
    pub fn session(&self) -> Session {
        Session::new(self.clone())
    }

    /// Resumes a session from a previously saved token.
    pub fn resume_session(&self, token: impl Into<String>) -> Session {
        let session = self.session();
        session.set_token(&token.into());
        session
    }

    /// Returns the session bound to this collection's slot in `container`,
    /// creating its state on first use. Sessions returned for the same
    /// container share state.
    ///
    /// Panics when the collection has not been through
    /// [`Collection::register`], as that is a bug in program setup.
    pub fn session_in(&self, container: &SessionContainer) -> Session {
        let state = container.state_for(self.slot);
        Session::with_state(self.clone(), state)
    }

    /// The base metadata and partition key value of an entity, extracted
    /// the way the engine sees them. Panics when the entity has no field
    /// matching the configured partition key name.
    pub fn entity_info<T: CosmosEntity>(
        &self,
        entity: &T,
    ) -> Result<(BaseModel, PartitionKeyValue), Error> {
        if self.partition_key.is_empty() {
            panic!("Collection partition_key is not configured");
        }
        let value = serde_json::to_value(entity)?;
        entity_info_value(&value, &self.partition_key)
    }

    /// Reads a document with eventual consistency, outside any session. A
    /// missing document yields the zero entity with `is_new()` true; rely
    /// on that rather than an error to distinguish absence.
    pub async fn stale_get<T: CosmosEntity>(
        &self,
        pk: impl Into<PartitionKeyValue>,
        id: &str,
    ) -> Result<T, Error> {
        let pk = pk.into();
        let (_, result) = self
            .fetch::<T>(&pk, id, ConsistencyLevel::Eventual, None, self.cancel.clone())
            .await;
        let mut entity = match result? {
            Some(entity) => entity,
            None => absent_entity(&self.partition_key, &pk, id)?,
        };
        post_get_hook(&mut entity, None)?;
        Ok(entity)
    }

    /// Like [`Collection::stale_get`], but a missing document surfaces as
    /// `NotFound`.
    pub async fn stale_get_existing<T: CosmosEntity>(
        &self,
        pk: impl Into<PartitionKeyValue>,
        id: &str,
    ) -> Result<T, Error> {
        let pk = pk.into();
        let (_, result) = self
            .fetch_existing::<T>(&pk, id, ConsistencyLevel::Eventual, None, self.cancel.clone())
            .await;
        let mut entity = result?;
        post_get_hook(&mut entity, None)?;
        Ok(entity)
    }

    /// A raw upsert without any consistency considerations: no etag check,
    /// last write wins.
    pub async fn racing_put<T: CosmosEntity>(&self, entity: &mut T) -> Result<(), Error> {
        crate::migration::sync_model(entity);
        entity.pre_put(None)?;
        let value = serde_json::to_value(&*entity)?;
        let (_, pk) = entity_info_value(&value, &self.partition_key)?;
        let options = CreateDocumentOptions {
            partition_key_value: Some(pk),
            is_upsert: true,
            ..Default::default()
        };
        let (_, result) = self
            .client
            .create_document(&self.db_name, &self.name, &value, options, self.cancel.clone())
            .await;
        result?;
        Ok(())
    }

    /// Runs a query against the collection and decodes the rows.
    pub async fn query<T: DeserializeOwned>(&self, query: Query) -> Result<Vec<T>, Error> {
        let response = self
            .client
            .query_documents(
                &self.db_name,
                &self.name,
                query,
                QueryDocumentsOptions::default(),
                self.cancel.clone(),
            )
            .await?;
        response
            .documents
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(Error::from))
            .collect()
    }

    /// Fetches one document; a 404 becomes `Ok(None)`.
    pub(crate) async fn fetch<T: CosmosEntity>(
        &self,
        pk: &PartitionKeyValue,
        id: &str,
        consistency: ConsistencyLevel,
        session_token: Option<String>,
        cancel: Option<CancellationToken>,
    ) -> (DocumentResponse, Result<Option<T>, Error>) {
        let (parsed, result) = self
            .fetch_existing::<T>(pk, id, consistency, session_token, cancel)
            .await;
        let result = match result {
            Ok(entity) => Ok(Some(entity)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        };
        (parsed, result)
    }

    pub(crate) async fn fetch_existing<T: CosmosEntity>(
        &self,
        pk: &PartitionKeyValue,
        id: &str,
        consistency: ConsistencyLevel,
        session_token: Option<String>,
        cancel: Option<CancellationToken>,
    ) -> (DocumentResponse, Result<T, Error>) {
        let options = GetDocumentOptions {
            partition_key_value: Some(pk.clone()),
            consistency_level: Some(consistency),
            session_token,
            ..Default::default()
        };
        let (parsed, result) = self
            .client
            .get_document(&self.db_name, &self.name, id, options, cancel)
            .await;
        let result = result
            .and_then(|value| serde_json::from_value(value).map_err(Error::from))
            .map_err(|e| e.context(format!("id='{id}' partition key value='{pk}'")));
        (parsed, result)
    }

    /// A consistent write: an entity with no etag is created demanding
    /// non-existence (a conflict is reported as `PreconditionFailed`, the
    /// way any other lost race is); an entity with an etag replaces
    /// conditionally on it.
    pub(crate) async fn put_consistent(
        &self,
        value: &Value,
        base: &BaseModel,
        pk: &PartitionKeyValue,
        cancel: Option<CancellationToken>,
    ) -> (DocumentResponse, Result<Resource, Error>) {
        if base.etag.is_empty() {
            let options = CreateDocumentOptions {
                partition_key_value: Some(pk.clone()),
                is_upsert: false,
                ..Default::default()
            };
            let (parsed, result) = self
                .client
                .create_document(&self.db_name, &self.name, value, options, cancel)
                .await;
            let result = result.map_err(|e| {
                if e.kind() == ErrorKind::Conflict {
                    Error::Service {
                        kind: ErrorKind::PreconditionFailed,
                        status: 409,
                        message: e.to_string(),
                    }
                } else {
                    e
                }
            });
            (parsed, result)
        } else {
            let options = ReplaceDocumentOptions {
                partition_key_value: Some(pk.clone()),
                if_match: Some(base.etag.clone()),
                ..Default::default()
            };
            self.client
                .replace_document(&self.db_name, &self.name, &base.id, value, options, cancel)
                .await
        }
    }
}
