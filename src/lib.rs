//! # azure-cosmosdb
//!
//! Microsoft Azure Cosmos DB client library with a session-consistent,
//! optimistically concurrent transaction layer.
//!
//! * [About Cosmos DB](https://azure.microsoft.com/en-us/services/cosmos-db/)
//! * [REST API Documentation](https://docs.microsoft.com/en-us/rest/api/cosmos-db/)
//!
//! The [`http`] module is a plain wrapper over the REST API: signed
//! requests, typed document operations, retry with backoff, the error
//! taxonomy. On top of it, [`Collection`], [`Session`] and [`Transaction`]
//! implement an opinionated interface meant to encourage safe programming
//! practices against a store whose only concurrency-control handle is the
//! per-document etag.
//!
//! The crate assumes the account is configured for session-level
//! consistency.
//!
//! ## Quickstart
//!
//! Declare a model embedding the base metadata, hand a collection handle a
//! client, and do the read-modify-write inside a transaction closure:
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use azure_cosmosdb::http::client::{Client, Config};
//! use azure_cosmosdb::{BaseModel, Collection, CosmosEntity};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! struct Account {
//!     #[serde(flatten)]
//!     base: BaseModel,
//!     model: String,
//!     #[serde(rename = "userId")]
//!     user_id: String, // partition key
//!     balance: i64,
//! }
//!
//! impl CosmosEntity for Account {
//!     const MODEL: &'static str = "Account/1";
//!
//!     fn base(&self) -> &BaseModel { &self.base }
//!     fn base_mut(&mut self) -> &mut BaseModel { &mut self.base }
//!     fn model(&self) -> &str { &self.model }
//!     fn model_mut(&mut self) -> &mut String { &mut self.model }
//! }
//!
//! async fn deposit(coll: &Collection, user: &str, amount: i64) -> Result<(), azure_cosmosdb::Error> {
//!     let session = coll.session();
//!     session
//!         .transaction(|txn| async move {
//!             let mut txn = txn.lock().await;
//!             let mut account: Account = txn.get(user, user).await?;
//!             account.balance += amount;
//!             txn.put(account);
//!             Ok(())
//!         })
//!         .await
//! }
//!
//! # async fn run() -> Result<(), azure_cosmosdb::Error> {
//! let config = Config::from_env().expect("COSMOSDB_KEY not set");
//! let client = Arc::new(Client::new("https://myaccount.documents.azure.com:443", config));
//! let coll = Collection::new(client, "mydb", "accounts", "userId");
//! deposit(&coll, "alice", 100).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Sessions and the entity cache
//!
//! A [`Session`] carries the service's session token, so writes are
//! read-your-writes within the session, and an entity cache fed by
//! successful commits. The session token survives serialization: save
//! [`Session::token`] and hand it to [`Collection::resume_session`] to
//! continue the logical session elsewhere.
//!
//! Transactions retry on contention, so the closure must be idempotent: do
//! not build up state inside it that assumes a single run. A closure can
//! abandon its queued write by returning [`Error::Rollback`].

pub mod changefeed;
pub mod collection;
pub mod container;
pub mod error;
pub mod http;
pub mod migration;
pub mod model;
pub mod session;
pub mod transaction;

pub use changefeed::{ChangeFeedReader, FeedPage};
pub use collection::{Collection, DocumentClient};
pub use container::SessionContainer;
pub use error::{Error, ErrorKind};
pub use http::partition_key::PartitionKeyValue;
pub use model::{BaseModel, CosmosEntity};
pub use session::{Session, DEFAULT_CONFLICT_RETRIES};
pub use transaction::Transaction;
