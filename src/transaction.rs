//! The transaction: a closure-scoped wrapper around a session that unlocks
//! the read and write operations which only make sense inside an
//! idempotent, retryable closure.

use serde_json::Value;

use crate::error::{Error, ErrorKind};
use crate::http::documents::ConsistencyLevel;
use crate::http::partition_key::PartitionKeyValue;
use crate::migration::post_get_hook;
use crate::model::{absent_entity, entity_info_value, unique_key, write_base, CosmosEntity};
use crate::session::Session;

/// A queued entity with its type erased, so one transaction object serves
/// every model type while the hooks still run against the concrete type at
/// commit time.
trait ErasedEntity: Send + Sync {
    fn sync_model(&mut self);
    fn pre_put(&mut self, txn: &Transaction) -> Result<(), Error>;
    fn to_json(&self) -> Result<Value, Error>;
}

impl<T: CosmosEntity> ErasedEntity for T {
    fn sync_model(&mut self) {
        crate::migration::sync_model(self);
    }

    fn pre_put(&mut self, txn: &Transaction) -> Result<(), Error> {
        CosmosEntity::pre_put(self, Some(txn))
    }

    fn to_json(&self) -> Result<Value, Error> {
        Ok(serde_json::to_value(self)?)
    }
}

/// One attempt of a read-modify-write cycle. Lives only inside a
/// [`Session::transaction`] closure and is discarded on each retry; the
/// session cache persists across attempts.
///
/// At most one distinct entity may be fetched and at most one queued for
/// put per attempt; the queued entity must be the fetched one.
pub struct Transaction {
    session: Session,
    /// The cache key fetched in the single allowed get.
    fetched_key: Option<String>,
    /// The entity queued by the single allowed put.
    queued: Option<Box<dyn ErasedEntity>>,
}

impl Transaction {
    pub(crate) fn new(session: Session) -> Transaction {
        Transaction {
            session,
            fetched_key: None,
            queued: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fetches the entity with the given partition key value and id.
    ///
    /// Reads are served from the session cache when possible; a miss goes
    /// to the database with session consistency and the current session
    /// token. A document the database does not have comes back as the zero
    /// entity with the id and partition key filled in and `is_new()` true.
    ///
    /// Fetching a second, different key in the same transaction fails with
    /// `NotImplemented`; repeating the same key is served from cache.
    pub async fn get<T: CosmosEntity>(
        &mut self,
        pk: impl Into<PartitionKeyValue>,
        id: &str,
    ) -> Result<T, Error> {
        let pk = pk.into();
        let key = unique_key(&pk, id);
        if let Some(fetched) = &self.fetched_key {
            if *fetched != key {
                return Err(Error::NotImplemented
                    .context("fetching more than one entity in a transaction is not supported yet"));
            }
        }

        let mut entity: T = match self.session.cache_get(&key) {
            Some(Some(serialized)) => serde_json::from_str(&serialized)?,
            Some(None) => absent_entity(&self.session.collection.partition_key, &pk, id)?,
            None => {
                let token = Some(self.session.token()).filter(|t| !t.is_empty());
                let (response, result) = self
                    .session
                    .collection
                    .fetch::<T>(&pk, id, ConsistencyLevel::Session, token, self.session.cancel.clone())
                    .await;
                if let Some(token) = &response.session_token {
                    if !token.is_empty() {
                        self.session.set_token(token);
                    }
                }
                match result? {
                    Some(entity) => {
                        self.session.cache_set(&key, Some(serde_json::to_string(&entity)?));
                        entity
                    }
                    None => {
                        // Known absent: remember that, so retries of the
                        // closure do not refetch.
                        self.session.cache_set(&key, None);
                        absent_entity(&self.session.collection.partition_key, &pk, id)?
                    }
                }
            }
        };

        self.fetched_key = Some(key);
        post_get_hook(&mut entity, Some(&*self))?;
        Ok(entity)
    }

    /// Queues an entity for write. Nothing network-visible happens until
    /// the closure returns `Ok` and the transaction commits.
    pub fn put<T: CosmosEntity + 'static>(&mut self, entity: T) {
        self.queued = Some(Box::new(entity));
    }

    pub(crate) fn has_queued_put(&self) -> bool {
        self.queued.is_some()
    }

    /// Writes the queued entity with compare-and-swap semantics: an entity
    /// with no etag is created demanding non-existence, one with an etag
    /// replaces conditionally on it.
    pub(crate) async fn commit(&mut self) -> Result<(), Error> {
        let Some(mut queued) = self.queued.take() else {
            return Ok(());
        };
        queued.sync_model();

        let collection = self.session.collection.clone();
        let value = queued.to_json()?;
        let (base, pk) = entity_info_value(&value, &collection.partition_key)?;
        let key = unique_key(&pk, &base.id);
        // Sanity check: help the developer out by not allowing a put of
        // anything but the entity fetched in this transaction.
        if self.fetched_key.as_deref() != Some(key.as_str()) {
            return Err(Error::PutWithoutGet);
        }

        queued.pre_put(&*self)?;
        let value = queued.to_json()?;

        let (response, result) = self
            .session
            .collection
            .put_consistent(&value, &base, &pk, self.session.cancel.clone())
            .await;

        // No matter what happened, a returned session token is valid and
        // must be kept, 412 included.
        if let Some(token) = &response.session_token {
            if !token.is_empty() {
                self.session.set_token(token);
            }
        }

        match result {
            Ok(new_base) => {
                let mut committed = value;
                write_base(&mut committed, &new_base);
                self.session.cache_set(&key, Some(committed.to_string()));
                Ok(())
            }
            Err(e) => {
                if e.kind() == ErrorKind::PreconditionFailed {
                    // The cached snapshot is stale; drop it so the next
                    // attempt refetches authoritatively.
                    self.session.cache_remove(&key);
                }
                Err(e)
            }
        }
    }
}
