//! A slot-indexed container for session states, for frameworks that want
//! "the current session for this collection" available in request-scoped
//! code.
//!
//! Each registered [`Collection`] gets a process-wide slot index; a
//! [`SessionContainer`] maps slot to shared session state. Attach a fresh
//! container to each unit of work (e.g. in your web framework's request
//! extensions) and ask the collection for its session:
//!
//! ```ignore
//! let coll = Collection::new(client, "mydb", "mycoll", "userId").register();
//! let container = SessionContainer::new();
//! let session = coll.session_in(&container);
//! // further session_in calls with the same container share state
//! ```
//!
//! [`Collection`]: crate::collection::Collection

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::session::SessionState;

// Slot indices are never 0; the zero value marks an unregistered
// collection.
static SESSION_SLOT_COUNT: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn next_session_slot() -> usize {
    SESSION_SLOT_COUNT.fetch_add(1, Ordering::Relaxed) + 1
}

/// A container of per-collection session states. Create one per unit of
/// work; creating a new container resets the sessions.
#[derive(Default)]
pub struct SessionContainer {
    states: Mutex<HashMap<usize, Arc<Mutex<SessionState>>>>,
}

impl SessionContainer {
    pub fn new() -> SessionContainer {
        SessionContainer::default()
    }

    pub(crate) fn state_for(&self, slot: usize) -> Arc<Mutex<SessionState>> {
        if slot == 0 {
            panic!(
                "storing session state in a container requires that Collection::register() \
                 has been called on the collection"
            );
        }
        Arc::clone(
            self.states
                .lock()
                .entry(slot)
                .or_insert_with(|| Arc::new(Mutex::new(SessionState::default()))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{Collection, DocumentClient};
    use std::sync::Arc as StdArc;

    fn test_collection() -> Collection {
        // No operations are performed in these tests, so the client is a
        // stub that refuses everything.
        struct NoClient;

        #[async_trait::async_trait]
        impl DocumentClient for NoClient {
            async fn get_document(
                &self,
                _: &str,
                _: &str,
                _: &str,
                _: crate::http::documents::get::GetDocumentOptions,
                _: Option<tokio_util::sync::CancellationToken>,
            ) -> (
                crate::http::documents::DocumentResponse,
                Result<serde_json::Value, crate::error::Error>,
            ) {
                unimplemented!()
            }

            async fn create_document(
                &self,
                _: &str,
                _: &str,
                _: &serde_json::Value,
                _: crate::http::documents::create::CreateDocumentOptions,
                _: Option<tokio_util::sync::CancellationToken>,
            ) -> (
                crate::http::documents::DocumentResponse,
                Result<crate::http::documents::Resource, crate::error::Error>,
            ) {
                unimplemented!()
            }

            async fn replace_document(
                &self,
                _: &str,
                _: &str,
                _: &str,
                _: &serde_json::Value,
                _: crate::http::documents::replace::ReplaceDocumentOptions,
                _: Option<tokio_util::sync::CancellationToken>,
            ) -> (
                crate::http::documents::DocumentResponse,
                Result<crate::http::documents::Resource, crate::error::Error>,
            ) {
                unimplemented!()
            }

            async fn delete_document(
                &self,
                _: &str,
                _: &str,
                _: &str,
                _: crate::http::documents::delete::DeleteDocumentOptions,
                _: Option<tokio_util::sync::CancellationToken>,
            ) -> (
                crate::http::documents::DocumentResponse,
                Result<(), crate::error::Error>,
            ) {
                unimplemented!()
            }

            async fn query_documents(
                &self,
                _: &str,
                _: &str,
                _: crate::http::documents::query::Query,
                _: crate::http::documents::query::QueryDocumentsOptions,
                _: Option<tokio_util::sync::CancellationToken>,
            ) -> Result<
                crate::http::documents::query::QueryDocumentsResponse<serde_json::Value>,
                crate::error::Error,
            > {
                unimplemented!()
            }

            async fn list_documents(
                &self,
                _: &str,
                _: &str,
                _: crate::http::documents::list::ListDocumentsOptions,
                _: Option<tokio_util::sync::CancellationToken>,
            ) -> Result<
                crate::http::documents::list::ListDocumentsResponse<serde_json::Value>,
                crate::error::Error,
            > {
                unimplemented!()
            }

            async fn partition_key_ranges(
                &self,
                _: &str,
                _: &str,
                _: Option<tokio_util::sync::CancellationToken>,
            ) -> Result<
                crate::http::partition_key_ranges::PartitionKeyRangesResponse,
                crate::error::Error,
            > {
                unimplemented!()
            }
        }

        Collection::new(StdArc::new(NoClient), "mydb", "mycoll", "userId")
    }

    #[test]
    fn register_is_idempotent() {
        let coll = test_collection();
        assert_eq!(coll.slot, 0);
        let coll = coll.register();
        let slot = coll.slot;
        assert_ne!(slot, 0);
        let coll = coll.register();
        assert_eq!(coll.slot, slot);
    }

    #[test]
    fn sessions_from_one_container_share_state() {
        let coll = test_collection().register();
        let container = SessionContainer::new();
        let a = coll.session_in(&container);
        let b = coll.session_in(&container);
        assert!(StdArc::ptr_eq(&a.state, &b.state));
    }

    #[test]
    fn different_collections_do_not_share_state() {
        let container = SessionContainer::new();
        let a = test_collection().register().session_in(&container);
        let b = test_collection().register().session_in(&container);
        assert!(!StdArc::ptr_eq(&a.state, &b.state));
    }

    #[test]
    fn a_new_container_resets_the_state() {
        let coll = test_collection().register();
        let a = coll.session_in(&SessionContainer::new());
        let b = coll.session_in(&SessionContainer::new());
        assert!(!StdArc::ptr_eq(&a.state, &b.state));
    }

    #[test]
    fn plain_sessions_never_share_state() {
        let coll = test_collection().register();
        let a = coll.session();
        let b = coll.session();
        assert!(!StdArc::ptr_eq(&a.state, &b.state));
    }

    #[test]
    #[should_panic(expected = "Collection::register()")]
    fn unregistered_collection_is_a_programmer_error() {
        let coll = test_collection();
        let container = SessionContainer::new();
        let _ = coll.session_in(&container);
    }
}
