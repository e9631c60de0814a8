//! Partition-key ranges and their paginated listing.
//!
//! A collection is divided into partition-key ranges, each identified by an
//! opaque id; ranges may split over time. The list endpoint is paginated by
//! a continuation token.

use std::collections::HashMap;

use reqwest::Method;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::http::client::Client;
use crate::http::links::pkranges_link;
use crate::http::{HEADER_CONTINUATION, HEADER_MAX_ITEM_COUNT};

/// One server-side unit of the collection's keyspace.
#[derive(Debug, Clone, Deserialize)]
pub struct PartitionKeyRange {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "minInclusive", default)]
    pub min_inclusive: String,
    #[serde(rename = "maxExclusive", default)]
    pub max_exclusive: String,
    #[serde(default)]
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GetPartitionKeyRangesOptions {
    pub max_item_count: Option<i32>,
    pub continuation: Option<String>,
}

impl GetPartitionKeyRangesOptions {
    fn as_headers(&self) -> HashMap<&'static str, String> {
        let mut headers = HashMap::new();
        if let Some(count) = self.max_item_count {
            headers.insert(HEADER_MAX_ITEM_COUNT, count.to_string());
        }
        if let Some(continuation) = &self.continuation {
            if !continuation.is_empty() {
                headers.insert(HEADER_CONTINUATION, continuation.clone());
            }
        }
        headers
    }
}

/// One page of the range listing.
#[derive(Debug, Clone, Default)]
pub struct PartitionKeyRangesPage {
    pub id: String,
    pub rid: String,
    pub partition_key_ranges: Vec<PartitionKeyRange>,
    pub continuation: Option<String>,
    pub request_charge: f64,
}

/// All ranges of a collection, with pagination swallowed.
#[derive(Debug, Clone, Default)]
pub struct PartitionKeyRangesResponse {
    pub partition_key_ranges: Vec<PartitionKeyRange>,
    pub request_charge: f64,
}

#[derive(Deserialize)]
struct PartitionKeyRangesBody {
    #[serde(rename = "_rid", default)]
    rid: String,
    #[serde(default)]
    id: String,
    #[serde(rename = "PartitionKeyRanges", default)]
    partition_key_ranges: Vec<PartitionKeyRange>,
}

/// The pure pagination state machine behind [`PartitionKeyRangesPager`].
#[derive(Debug, Default)]
struct PageCursor {
    started: bool,
    fetched_any: bool,
    continuation: Option<String>,
    failed: bool,
}

impl PageCursor {
    /// True when another page can be fetched: before the first fetch, or
    /// while the last page carried a continuation. A failed fetch is
    /// sticky.
    fn next(&mut self) -> bool {
        if self.failed {
            return false;
        }
        if self.fetched_any && self.continuation.is_none() {
            return false;
        }
        self.started = true;
        true
    }

    fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    fn complete(&mut self, continuation: Option<String>) {
        self.fetched_any = true;
        self.continuation = continuation.filter(|c| !c.is_empty());
    }

    fn fail(&mut self) {
        self.failed = true;
    }

    fn assert_started(&self) {
        if !self.started {
            panic!("current_page() called before next()");
        }
    }
}

/// A stateful iterator over the pages of a collection's range listing.
///
/// Usage follows the `next()` / `current_page()` protocol: `next()` reports
/// whether a page is available, `current_page()` fetches it. Calling
/// `current_page()` before the first `next()` is a programmer error.
pub struct PartitionKeyRangesPager<'a> {
    client: &'a Client,
    db_name: String,
    coll_name: String,
    options: GetPartitionKeyRangesOptions,
    cursor: PageCursor,
}

impl<'a> PartitionKeyRangesPager<'a> {
    /// True when a page is available to fetch. After an error from
    /// [`PartitionKeyRangesPager::current_page`] this always returns false.
    pub fn next(&mut self) -> bool {
        self.cursor.next()
    }

    /// Fetches the page announced by the last [`PartitionKeyRangesPager::next`].
    pub async fn current_page(
        &mut self,
        cancel: Option<CancellationToken>,
    ) -> Result<PartitionKeyRangesPage, Error> {
        self.cursor.assert_started();
        let options = GetPartitionKeyRangesOptions {
            max_item_count: self.options.max_item_count,
            continuation: self
                .cursor
                .continuation()
                .map(str::to_string)
                .or_else(|| self.options.continuation.clone()),
        };
        match fetch_page(self.client, &self.db_name, &self.coll_name, &options, cancel).await {
            Ok(page) => {
                self.cursor.complete(page.continuation.clone());
                Ok(page)
            }
            Err(e) => {
                self.cursor.fail();
                Err(e)
            }
        }
    }
}

async fn fetch_page(
    client: &Client,
    db_name: &str,
    coll_name: &str,
    options: &GetPartitionKeyRangesOptions,
    cancel: Option<CancellationToken>,
) -> Result<PartitionKeyRangesPage, Error> {
    let response = client
        .call(
            Method::GET,
            &pkranges_link(db_name, coll_name),
            None,
            options.as_headers(),
            cancel,
        )
        .await?;
    response.check()?;
    let decoded: PartitionKeyRangesBody = response.json()?;
    Ok(PartitionKeyRangesPage {
        id: decoded.id,
        rid: decoded.rid,
        partition_key_ranges: decoded.partition_key_ranges,
        continuation: response.meta.continuation.clone(),
        request_charge: response.meta.request_charge,
    })
}

impl Client {
    /// Returns a pager over the partition-key ranges of a collection.
    pub fn get_partition_key_ranges_pager<'a>(
        &'a self,
        db_name: &str,
        coll_name: &str,
        options: GetPartitionKeyRangesOptions,
    ) -> PartitionKeyRangesPager<'a> {
        PartitionKeyRangesPager {
            client: self,
            db_name: db_name.to_string(),
            coll_name: coll_name.to_string(),
            options,
            cursor: PageCursor::default(),
        }
    }

    /// Lists every partition-key range of a collection, concatenating all
    /// pages and summing their request charges.
    pub async fn get_partition_key_ranges(
        &self,
        db_name: &str,
        coll_name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<PartitionKeyRangesResponse, Error> {
        let mut pager =
            self.get_partition_key_ranges_pager(db_name, coll_name, Default::default());
        let mut response = PartitionKeyRangesResponse::default();
        while pager.next() {
            let page = pager.current_page(cancel.clone()).await?;
            response.partition_key_ranges.extend(page.partition_key_ranges);
            response.request_charge += page.request_charge;
        }
        Ok(response)
    }
}
