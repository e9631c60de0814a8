//! Reading the incremental feed (change feed) of a collection.
//!
//! The feed is scoped to a partition-key range: each read hands back the
//! documents changed since a supplied etag, plus the etag to use next.
//! [`ChangeFeedReader`] reconstructs the whole collection's feed by
//! tracking one etag per range and refreshing the range list as ranges
//! split.

use std::collections::HashMap;

use crate::collection::Collection;
use crate::error::Error;
use crate::http::documents::list::ListDocumentsOptions;
use crate::model::CosmosEntity;

/// One page of changes on a single partition-key range.
#[derive(Debug, Clone)]
pub struct FeedPage<T> {
    /// Documents changed since the supplied etag. Empty when the service
    /// answered 304 (nothing changed).
    pub documents: Vec<T>,
    /// The etag to pass on the next read of this range.
    pub etag: String,
    pub request_charge: f64,
}

impl Collection {
    /// Reads the documents changed on one partition-key range since
    /// `etag`. Passing `None` reads the range from the beginning.
    pub async fn read_feed<T: CosmosEntity>(
        &self,
        range_id: &str,
        etag: Option<&str>,
        max_item_count: i32,
    ) -> Result<FeedPage<T>, Error> {
        let options = ListDocumentsOptions {
            max_item_count: Some(max_item_count),
            incremental_feed: true,
            if_none_match: etag.map(str::to_string),
            partition_key_range_id: Some(range_id.to_string()),
            ..Default::default()
        };
        let response = self
            .client
            .list_documents(&self.db_name, &self.name, options, self.cancel.clone())
            .await?;
        let documents = response
            .documents
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(Error::from))
            .collect::<Result<Vec<T>, Error>>()?;
        Ok(FeedPage {
            documents,
            etag: response.etag.unwrap_or_default(),
            request_charge: response.request_charge,
        })
    }
}

/// Polls the change feed across every partition-key range of a collection.
///
/// One etag is tracked per range id. On every poll the range list is
/// refreshed; etags are carried forward only for ranges that still exist,
/// so a split simply makes the new ranges start from the beginning.
pub struct ChangeFeedReader {
    collection: Collection,
    page_size: i32,
    etags: HashMap<String, String>,
}

impl ChangeFeedReader {
    pub fn new(collection: Collection, page_size: i32) -> ChangeFeedReader {
        ChangeFeedReader {
            collection,
            page_size,
            etags: HashMap::new(),
        }
    }

    /// Resumes a reader from the etags of an earlier one.
    pub fn resume(
        collection: Collection,
        page_size: i32,
        etags: HashMap<String, String>,
    ) -> ChangeFeedReader {
        ChangeFeedReader {
            collection,
            page_size,
            etags,
        }
    }

    /// The per-range etags; serialize these to resume later.
    pub fn etags(&self) -> &HashMap<String, String> {
        &self.etags
    }

    /// Reads every range once and returns the documents changed since the
    /// previous poll.
    pub async fn poll<T: CosmosEntity>(&mut self) -> Result<Vec<T>, Error> {
        let ranges = self
            .collection
            .client
            .partition_key_ranges(
                &self.collection.db_name,
                &self.collection.name,
                self.collection.cancel.clone(),
            )
            .await?
            .partition_key_ranges;

        self.etags
            .retain(|id, _| ranges.iter().any(|range| range.id == *id));

        let mut changed = Vec::new();
        for range in &ranges {
            let etag = self.etags.get(&range.id).cloned();
            let page = self
                .collection
                .read_feed::<T>(&range.id, etag.as_deref(), self.page_size)
                .await?;
            if !page.etag.is_empty() {
                self.etags.insert(range.id.clone(), page.etag);
            }
            changed.extend(page.documents);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::DocumentClient;
    use crate::error::Error;
    use crate::http::documents::create::CreateDocumentOptions;
    use crate::http::documents::delete::DeleteDocumentOptions;
    use crate::http::documents::get::GetDocumentOptions;
    use crate::http::documents::list::ListDocumentsResponse;
    use crate::http::documents::query::{Query, QueryDocumentsOptions, QueryDocumentsResponse};
    use crate::http::documents::replace::ReplaceDocumentOptions;
    use crate::http::documents::{DocumentResponse, Resource};
    use crate::http::partition_key_ranges::{PartitionKeyRange, PartitionKeyRangesResponse};
    use crate::model::BaseModel;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    #[ctor::ctor]
    fn init() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct FeedDoc {
        #[serde(flatten)]
        base: BaseModel,
        model: String,
        #[serde(rename = "partitionkey")]
        partition_key: String,
    }

    impl CosmosEntity for FeedDoc {
        const MODEL: &'static str = "FeedDoc/0";

        fn base(&self) -> &BaseModel {
            &self.base
        }
        fn base_mut(&mut self) -> &mut BaseModel {
            &mut self.base
        }
        fn model(&self) -> &str {
            &self.model
        }
        fn model_mut(&mut self) -> &mut String {
            &mut self.model
        }
    }

    /// A feed per range: consecutive etags, and the documents appearing at
    /// each etag step.
    #[derive(Default)]
    struct FeedState {
        ranges: Vec<String>,
        // (range id, etag asked for) observed on each list call
        requests: Vec<(String, Option<String>)>,
        // range id -> scripted responses, popped front to back
        pages: HashMap<String, Vec<(Vec<Value>, String, bool)>>,
    }

    struct FeedMock {
        state: Mutex<FeedState>,
    }

    impl FeedMock {
        fn new() -> Arc<FeedMock> {
            Arc::new(FeedMock {
                state: Mutex::new(FeedState::default()),
            })
        }
    }

    fn unsupported() -> Error {
        Error::NotImplemented
    }

    #[async_trait]
    impl DocumentClient for FeedMock {
        async fn get_document(
            &self,
            _: &str,
            _: &str,
            _: &str,
            _: GetDocumentOptions,
            _: Option<CancellationToken>,
        ) -> (DocumentResponse, Result<Value, Error>) {
            (DocumentResponse::default(), Err(unsupported()))
        }

        async fn create_document(
            &self,
            _: &str,
            _: &str,
            _: &Value,
            _: CreateDocumentOptions,
            _: Option<CancellationToken>,
        ) -> (DocumentResponse, Result<Resource, Error>) {
            (DocumentResponse::default(), Err(unsupported()))
        }

        async fn replace_document(
            &self,
            _: &str,
            _: &str,
            _: &str,
            _: &Value,
            _: ReplaceDocumentOptions,
            _: Option<CancellationToken>,
        ) -> (DocumentResponse, Result<Resource, Error>) {
            (DocumentResponse::default(), Err(unsupported()))
        }

        async fn delete_document(
            &self,
            _: &str,
            _: &str,
            _: &str,
            _: DeleteDocumentOptions,
            _: Option<CancellationToken>,
        ) -> (DocumentResponse, Result<(), Error>) {
            (DocumentResponse::default(), Err(unsupported()))
        }

        async fn query_documents(
            &self,
            _: &str,
            _: &str,
            _: Query,
            _: QueryDocumentsOptions,
            _: Option<CancellationToken>,
        ) -> Result<QueryDocumentsResponse<Value>, Error> {
            Err(unsupported())
        }

        async fn list_documents(
            &self,
            _: &str,
            _: &str,
            options: crate::http::documents::list::ListDocumentsOptions,
            _: Option<CancellationToken>,
        ) -> Result<ListDocumentsResponse<Value>, Error> {
            assert!(options.incremental_feed);
            let range_id = options.partition_key_range_id.clone().unwrap_or_default();
            let mut state = self.state.lock();
            state
                .requests
                .push((range_id.clone(), options.if_none_match.clone()));
            let (documents, etag, not_modified) = state
                .pages
                .get_mut(&range_id)
                .and_then(|pages| {
                    if pages.is_empty() {
                        None
                    } else {
                        Some(pages.remove(0))
                    }
                })
                .unwrap_or((Vec::new(), String::new(), true));
            Ok(ListDocumentsResponse {
                count: documents.len() as i32,
                documents: if not_modified { Vec::new() } else { documents },
                request_charge: 1.0,
                session_token: None,
                continuation: None,
                etag: Some(etag).filter(|e| !e.is_empty()),
                not_modified,
            })
        }

        async fn partition_key_ranges(
            &self,
            _: &str,
            _: &str,
            _: Option<CancellationToken>,
        ) -> Result<PartitionKeyRangesResponse, Error> {
            let state = self.state.lock();
            Ok(PartitionKeyRangesResponse {
                partition_key_ranges: state
                    .ranges
                    .iter()
                    .map(|id| PartitionKeyRange {
                        id: id.clone(),
                        min_inclusive: String::new(),
                        max_exclusive: String::new(),
                        parents: Vec::new(),
                    })
                    .collect(),
                request_charge: 1.0,
            })
        }
    }

    fn feed_doc(id: &str) -> Value {
        json!({"id": id, "_etag": "e", "model": "FeedDoc/0", "partitionkey": "p"})
    }

    fn collection(mock: Arc<FeedMock>) -> Collection {
        Collection::new(mock, "feedtest", "feedtest-1", "partitionkey")
    }

    #[tokio::test]
    async fn changed_document_appears_once_then_not_modified() {
        let mock = FeedMock::new();
        {
            let mut state = mock.state.lock();
            state.ranges = vec!["0".to_string()];
            state.pages.insert(
                "0".to_string(),
                vec![
                    (vec![feed_doc("doc1")], "e1".to_string(), false),
                    (Vec::new(), "e2".to_string(), true),
                ],
            );
        }
        let mut reader = ChangeFeedReader::new(collection(mock.clone()), 10);

        let first: Vec<FeedDoc> = reader.poll().await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].base.id, "doc1");
        assert_eq!(reader.etags().get("0").unwrap(), "e1");

        // 304: nothing changed, but the new etag is still adopted
        let second: Vec<FeedDoc> = reader.poll().await.unwrap();
        assert!(second.is_empty());
        assert_eq!(reader.etags().get("0").unwrap(), "e2");

        let state = mock.state.lock();
        assert_eq!(state.requests[0], ("0".to_string(), None));
        assert_eq!(state.requests[1], ("0".to_string(), Some("e1".to_string())));
    }

    #[tokio::test]
    async fn split_drops_etags_of_vanished_ranges() {
        let mock = FeedMock::new();
        {
            let mut state = mock.state.lock();
            state.ranges = vec!["0".to_string()];
            state
                .pages
                .insert("0".to_string(), vec![(vec![feed_doc("a")], "e1".to_string(), false)]);
        }
        let mut reader = ChangeFeedReader::new(collection(mock.clone()), 10);
        let _: Vec<FeedDoc> = reader.poll().await.unwrap();
        assert!(reader.etags().contains_key("0"));

        // the range splits into 1 and 2
        {
            let mut state = mock.state.lock();
            state.ranges = vec!["1".to_string(), "2".to_string()];
            state
                .pages
                .insert("1".to_string(), vec![(vec![feed_doc("b")], "f1".to_string(), false)]);
            state
                .pages
                .insert("2".to_string(), vec![(vec![feed_doc("c")], "g1".to_string(), false)]);
        }
        let docs: Vec<FeedDoc> = reader.poll().await.unwrap();
        assert_eq!(docs.len(), 2);
        assert!(!reader.etags().contains_key("0"));
        assert_eq!(reader.etags().get("1").unwrap(), "f1");
        assert_eq!(reader.etags().get("2").unwrap(), "g1");

        // the new ranges were read from the beginning
        let state = mock.state.lock();
        assert!(state
            .requests
            .iter()
            .any(|(range, etag)| range == "1" && etag.is_none()));
    }

    #[tokio::test]
    async fn resume_carries_etags() {
        let mock = FeedMock::new();
        {
            let mut state = mock.state.lock();
            state.ranges = vec!["0".to_string()];
            state
                .pages
                .insert("0".to_string(), vec![(Vec::new(), "e9".to_string(), true)]);
        }
        let etags = HashMap::from([("0".to_string(), "e8".to_string())]);
        let mut reader = ChangeFeedReader::resume(collection(mock.clone()), 10, etags);
        let docs: Vec<FeedDoc> = reader.poll().await.unwrap();
        assert!(docs.is_empty());

        let state = mock.state.lock();
        assert_eq!(state.requests[0], ("0".to_string(), Some("e8".to_string())));
    }
}
