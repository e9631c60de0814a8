//! Sessions: the unit of read-your-writes consistency and entity caching.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::collection::Collection;
use crate::error::{Error, ErrorKind};
use crate::http::partition_key::PartitionKeyValue;
use crate::model::{unique_key, CosmosEntity};
use crate::transaction::Transaction;

/// How many times [`Session::transaction`] retries a contended commit by
/// default.
pub const DEFAULT_CONFLICT_RETRIES: usize = 3;

const CONTENTION_RETRY_DELAY: Duration = Duration::from_millis(100);

/// The mutable state shared by every copy of a session: the current
/// session token and the entity cache.
///
/// Cache values are dedicated serialized snapshots; `None` marks a key the
/// database is known not to have.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) token: String,
    pub(crate) cache: HashMap<String, Option<String>>,
}

/// A session enables the service's session-level consistency: every write
/// updates the session token used by the next operation, giving monotonic
/// read-your-writes within the session.
///
/// Sessions are value types; [`Session::with_cancel`] and
/// [`Session::with_retries`] return copies sharing the same underlying
/// state. The state (token and entity cache) is not synchronized with
/// respect to concurrent use, so a session belongs to one logical flow of
/// control at a time, e.g. one per handled request.
///
/// Reads and writes happen inside [`Session::transaction`].
#[derive(Clone)]
pub struct Session {
    pub(crate) collection: Collection,
    pub(crate) conflict_retries: usize,
    pub(crate) cancel: Option<CancellationToken>,
    pub(crate) state: Arc<Mutex<SessionState>>,
}

impl Session {
    pub(crate) fn new(collection: Collection) -> Session {
        let cancel = collection.cancel.clone();
        Session {
            collection,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
            cancel,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    pub(crate) fn with_state(collection: Collection, state: Arc<Mutex<SessionState>>) -> Session {
        let cancel = collection.cancel.clone();
        Session {
            collection,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
            cancel,
            state,
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// The current session token. Serialize this to resume the session
    /// later via [`Collection::resume_session`].
    pub fn token(&self) -> String {
        self.state.lock().token.clone()
    }

    /// A copy of this session using the given cancellation token. State is
    /// shared with the original.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Session {
        self.cancel = Some(cancel);
        self
    }

    /// A copy of this session with a different conflict retry budget.
    /// State is shared with the original.
    pub fn with_retries(mut self, retries: usize) -> Session {
        self.conflict_retries = retries;
        self
    }

    /// Removes an entity from the session cache, so that the next get goes
    /// out to the database.
    pub fn evict(&self, pk: &PartitionKeyValue, id: &str) {
        let key = unique_key(pk, id);
        self.state.lock().cache.remove(&key);
    }

    /// Convenience for a simple get without explicitly running a
    /// transaction closure.
    pub async fn get<T: CosmosEntity>(
        &self,
        pk: impl Into<PartitionKeyValue>,
        id: &str,
    ) -> Result<T, Error> {
        let mut txn = Transaction::new(self.clone());
        txn.get(pk, id).await
    }

    /// Runs `closure` as an optimistically concurrent read-modify-write
    /// cycle, retrying on contention.
    ///
    /// The closure may fetch one entity with [`Transaction::get`], modify
    /// it, and queue it with [`Transaction::put`]; the commit happens when
    /// the closure returns `Ok`. A commit that loses the etag race sleeps
    /// briefly and reruns the closure against a fresh transaction, up to
    /// the conflict retry budget, after which [`Error::Contention`]
    /// surfaces. The closure must therefore be idempotent.
    ///
    /// Returning [`Error::Rollback`] abandons a queued put: the
    /// transaction completes with neither a commit nor an error. Any other
    /// closure error is surfaced as-is.
    ///
    /// ```ignore
    /// session.transaction(|txn| async move {
    ///     let mut txn = txn.lock().await;
    ///     let mut doc: MyModel = txn.get("alice", "id1").await?;
    ///     doc.x += 1;
    ///     txn.put(doc);
    ///     Ok(())
    /// }).await?;
    /// ```
    pub async fn transaction<F, Fut>(&self, closure: F) -> Result<(), Error>
    where
        F: Fn(Arc<tokio::sync::Mutex<Transaction>>) -> Fut,
        Fut: Future<Output = Result<(), Error>>,
    {
        if self.conflict_retries == 0 {
            return Err(Error::RetriesZero);
        }
        for _ in 0..self.conflict_retries {
            let txn = Arc::new(tokio::sync::Mutex::new(Transaction::new(self.clone())));
            let outcome = closure(Arc::clone(&txn)).await;
            let mut txn = txn.lock().await;
            match outcome {
                Ok(()) if txn.has_queued_put() => match txn.commit().await {
                    Err(e) if e.kind() == ErrorKind::PreconditionFailed => {
                        self.sleep_between_attempts().await?;
                        continue;
                    }
                    other => return other,
                },
                Ok(()) => return Ok(()),
                // Only the exact sentinel rolls back; a wrapped one is a
                // real error.
                Err(Error::Rollback) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
        Err(Error::Contention)
    }

    async fn sleep_between_attempts(&self) -> Result<(), Error> {
        match &self.cancel {
            Some(cancel) => {
                tokio::select! {
                    _ = cancel.cancelled() => Err(Error::Cancelled),
                    _ = tokio::time::sleep(CONTENTION_RETRY_DELAY) => Ok(()),
                }
            }
            None => {
                tokio::time::sleep(CONTENTION_RETRY_DELAY).await;
                Ok(())
            }
        }
    }

    pub(crate) fn set_token(&self, token: &str) {
        self.state.lock().token = token.to_string();
    }

    pub(crate) fn cache_get(&self, key: &str) -> Option<Option<String>> {
        self.state.lock().cache.get(key).cloned()
    }

    pub(crate) fn cache_set(&self, key: &str, entry: Option<String>) {
        self.state.lock().cache.insert(key.to_string(), entry);
    }

    pub(crate) fn cache_remove(&self, key: &str) {
        self.state.lock().cache.remove(key);
    }
}
