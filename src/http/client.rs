//! The request layer: header assembly, the HTTP exchange itself,
//! retry/backoff, error mapping and response metadata parsing.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use time::macros::format_description;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ErrorKind};
use crate::http::auth::{auth_header, signed_payload};
use crate::http::documents::create::CreateDocumentOptions;
use crate::http::documents::delete::DeleteDocumentOptions;
use crate::http::documents::get::GetDocumentOptions;
use crate::http::documents::list::{ListDocumentsOptions, ListDocumentsResponse, ListResponseBody};
use crate::http::documents::query::{
    Query, QueryDocumentsOptions, QueryDocumentsResponse, QueryResponseBody,
};
use crate::http::documents::replace::ReplaceDocumentOptions;
use crate::http::documents::{DocumentResponse, Resource};
use crate::http::links::{doc_link, docs_link};
use crate::http::{
    API_VERSION, HEADER_AUTHORIZATION, HEADER_CONTINUATION, HEADER_ETAG, HEADER_REQUEST_CHARGE,
    HEADER_SESSION_TOKEN, HEADER_VERSION, HEADER_X_DATE,
};

/// The environment variable holding the master key, honored by tests and
/// administrative tooling.
pub const COSMOSDB_KEY_ENV: &str = "COSMOSDB_KEY";

const DEFAULT_MAX_RETRIES: usize = 3;

/// Configuration for a [`Client`].
#[derive(Debug, Clone)]
pub struct Config {
    /// The base64-encoded master key of the account.
    pub master_key: String,
    /// How many times a throttled or unavailable request is retried before
    /// [`Error::MaxRetriesExceeded`] is returned.
    pub max_retries: usize,
}

impl Config {
    pub fn new(master_key: impl Into<String>) -> Config {
        Config {
            master_key: master_key.into(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Reads the master key from the `COSMOSDB_KEY` environment variable.
    pub fn from_env() -> Option<Config> {
        std::env::var(COSMOSDB_KEY_ENV).ok().map(Config::new)
    }
}

/// A low-level client for one Cosmos DB account.
///
/// The client only holds immutable configuration and a shared HTTP
/// connection pool, so it is safe to share between tasks.
pub struct Client {
    url: String,
    config: Config,
    http: reqwest::Client,
}

/// Metadata parsed out of every response, success or failure.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResponseMeta {
    pub request_charge: f64,
    pub session_token: Option<String>,
    pub continuation: Option<String>,
    pub etag: Option<String>,
    pub content_length: Option<u64>,
}

impl ResponseMeta {
    fn parse(headers: &HeaderMap) -> ResponseMeta {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        ResponseMeta {
            request_charge: text(HEADER_REQUEST_CHARGE)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0),
            session_token: text(HEADER_SESSION_TOKEN),
            continuation: text(HEADER_CONTINUATION),
            etag: text(HEADER_ETAG),
            content_length: headers
                .get(reqwest::header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok()),
        }
    }
}

/// A fully buffered HTTP response plus its parsed metadata.
pub(crate) struct ApiResponse {
    pub status: u16,
    pub meta: ResponseMeta,
    pub body: Bytes,
}

impl ApiResponse {
    /// Maps the status to the error taxonomy. 2xx and 304 are success
    /// unconditionally.
    pub(crate) fn check(&self) -> Result<(), Error> {
        if (200..300).contains(&self.status) || self.status == 304 {
            return Ok(());
        }
        let message = String::from_utf8_lossy(&self.body).trim().to_string();
        tracing::debug!(status = self.status, %message, "error response from Cosmos DB");
        let kind = ErrorKind::from_status(self.status).unwrap_or(ErrorKind::UnexpectedStatus);
        Err(Error::Service {
            kind,
            status: self.status,
            message,
        })
    }

    pub(crate) fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

fn retriable(status: u16) -> bool {
    status == 429 || status == 503
}

/// Exponential backoff with jitter: `2^n * uniform[300,600)` milliseconds,
/// with the exponent clamped to 8 for retry counts 9..=13 and to 13 beyond.
fn backoff_delay(retry_count: usize) -> Duration {
    const MIN_DELAY_MS: u64 = 300;
    let exponent = if retry_count > 13 {
        13
    } else if retry_count > 8 {
        8
    } else {
        retry_count as u32
    };
    let jitter = rand::thread_rng().gen_range(MIN_DELAY_MS..MIN_DELAY_MS * 2);
    Duration::from_millis((1u64 << exponent) * jitter)
}

fn http_date(now: OffsetDateTime) -> String {
    // RFC1123 with an explicit GMT suffix, as the signing scheme expects.
    now.format(format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    ))
    .unwrap_or_default()
}

impl Client {
    /// Creates a client for the account at `url`.
    pub fn new(url: impl Into<String>, config: Config) -> Client {
        Client {
            url: url.into().trim_end_matches('/').to_string(),
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Replaces the HTTP client, e.g. to tune TLS or proxy settings.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Client {
        self.http = http;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn default_headers(
        &self,
        method: &Method,
        link: &str,
    ) -> Result<HashMap<&'static str, String>, Error> {
        let date = http_date(OffsetDateTime::now_utc());
        let signature = signed_payload(method.as_str(), link, &date, &self.config.master_key)?;
        let mut headers = HashMap::new();
        headers.insert(HEADER_X_DATE, date);
        headers.insert(HEADER_VERSION, API_VERSION.to_string());
        headers.insert(HEADER_AUTHORIZATION, auth_header(&signature));
        Ok(headers)
    }

    /// Performs one logical exchange, retrying throttled and unavailable
    /// responses. Only transport-level failures (including cancellation and
    /// retry exhaustion) surface as `Err`; any HTTP response, success or
    /// not, comes back as an [`ApiResponse`] with its metadata parsed and
    /// its body fully read.
    pub(crate) async fn call(
        &self,
        method: Method,
        link: &str,
        body: Option<Vec<u8>>,
        headers: HashMap<&'static str, String>,
        cancel: Option<CancellationToken>,
    ) -> Result<ApiResponse, Error> {
        let mut merged = self.default_headers(&method, link)?;
        merged.extend(headers);

        let url = format!("{}/{}", self.url, link);

        let exchange = async {
            for retry_count in 0..=self.config.max_retries {
                if retry_count > 0 {
                    tokio::time::sleep(backoff_delay(retry_count)).await;
                }

                let mut builder = self.http.request(method.clone(), &url);
                for (name, value) in &merged {
                    builder = builder.header(*name, value.as_str());
                }
                if let Some(body) = &body {
                    builder = builder.body(body.clone());
                }

                tracing::debug!(
                    %method,
                    %url,
                    attempt = retry_count + 1,
                    max_attempts = self.config.max_retries + 1,
                    "Cosmos request"
                );
                let response = self.http.execute(builder.build()?).await?;
                let status = response.status().as_u16();
                let meta = ResponseMeta::parse(response.headers());
                // The body is read on every path so the connection can be
                // reused.
                let body = response.bytes().await?;
                tracing::debug!(status, "Cosmos response");

                if retriable(status) {
                    continue;
                }
                return Ok(ApiResponse { status, meta, body });
            }
            Err(Error::MaxRetriesExceeded)
        };

        match cancel {
            Some(cancel) => {
                tokio::select! {
                    _ = cancel.cancelled() => Err(Error::Cancelled),
                    result = exchange => result,
                }
            }
            None => exchange.await,
        }
    }

    /// A document exchange: like [`Client::call`], but the response
    /// metadata is handed back even when the status maps to an error, so
    /// callers can honor session tokens carried on failures.
    pub(crate) async fn document_exchange(
        &self,
        method: Method,
        link: String,
        body: Option<Vec<u8>>,
        headers: Result<HashMap<&'static str, String>, Error>,
        cancel: Option<CancellationToken>,
    ) -> (DocumentResponse, Result<ApiResponse, Error>) {
        let headers = match headers {
            Ok(headers) => headers,
            Err(e) => return (DocumentResponse::default(), Err(e)),
        };
        match self.call(method, &link, body, headers, cancel).await {
            Ok(response) => {
                let parsed = DocumentResponse::from_meta(&response.meta);
                match response.check() {
                    Ok(()) => (parsed, Ok(response)),
                    Err(e) => (parsed, Err(e)),
                }
            }
            Err(e) => (DocumentResponse::default(), Err(e)),
        }
    }

    /// Creates a document. With `is_upsert` the write is unconditional;
    /// without it an existing id in the partition fails with `Conflict`.
    pub async fn create_document<D: Serialize>(
        &self,
        db_name: &str,
        coll_name: &str,
        document: &D,
        options: &CreateDocumentOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<(Resource, DocumentResponse), Error> {
        let body = serde_json::to_vec(document)?;
        let (parsed, result) = self
            .document_exchange(
                Method::POST,
                docs_link(db_name, coll_name),
                Some(body),
                options.as_headers(),
                cancel,
            )
            .await;
        let response = result?;
        Ok((response.json()?, parsed))
    }

    /// Reads a document. On 404 the caller sees `NotFound` and no document.
    pub async fn get_document<T: DeserializeOwned>(
        &self,
        db_name: &str,
        coll_name: &str,
        id: &str,
        options: &GetDocumentOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<(T, DocumentResponse), Error> {
        let (parsed, result) = self
            .document_exchange(
                Method::GET,
                doc_link(db_name, coll_name, id),
                None,
                options.as_headers(),
                cancel,
            )
            .await;
        let response = result?;
        Ok((response.json()?, parsed))
    }

    /// Replaces a whole document; with `if_match` set this is a
    /// compare-and-swap.
    pub async fn replace_document<D: Serialize>(
        &self,
        db_name: &str,
        coll_name: &str,
        id: &str,
        document: &D,
        options: &ReplaceDocumentOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<(Resource, DocumentResponse), Error> {
        let body = serde_json::to_vec(document)?;
        let (parsed, result) = self
            .document_exchange(
                Method::PUT,
                doc_link(db_name, coll_name, id),
                Some(body),
                options.as_headers(),
                cancel,
            )
            .await;
        let response = result?;
        Ok((response.json()?, parsed))
    }

    /// Deletes a document.
    pub async fn delete_document(
        &self,
        db_name: &str,
        coll_name: &str,
        id: &str,
        options: &DeleteDocumentOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<DocumentResponse, Error> {
        let (parsed, result) = self
            .document_exchange(
                Method::DELETE,
                doc_link(db_name, coll_name, id),
                None,
                options.as_headers(),
                cancel,
            )
            .await;
        result?;
        Ok(parsed)
    }

    /// Queries a collection. The decoded rows are a sequence of `T`.
    pub async fn query_documents<T: DeserializeOwned>(
        &self,
        db_name: &str,
        coll_name: &str,
        query: &Query,
        options: &QueryDocumentsOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<QueryDocumentsResponse<T>, Error> {
        let headers = options.as_headers()?;
        let body = serde_json::to_vec(query)?;
        let response = self
            .call(Method::POST, &docs_link(db_name, coll_name), Some(body), headers, cancel)
            .await?;
        response.check()?;
        let decoded: QueryResponseBody<T> = response.json()?;
        Ok(QueryDocumentsResponse {
            documents: decoded.documents,
            count: decoded.count,
            continuation: response.meta.continuation.clone(),
            request_charge: response.meta.request_charge,
            session_token: response.meta.session_token.clone(),
        })
    }

    /// Lists documents, either plainly or as the incremental feed of one
    /// partition-key range. A 304 in feed mode leaves the documents empty
    /// and sets `not_modified`; the etag for the next read is still
    /// returned.
    pub async fn list_documents<T: DeserializeOwned>(
        &self,
        db_name: &str,
        coll_name: &str,
        options: &ListDocumentsOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<ListDocumentsResponse<T>, Error> {
        let headers = options.as_headers()?;
        let response = self
            .call(Method::GET, &docs_link(db_name, coll_name), None, headers, cancel)
            .await?;
        response.check()?;
        let mut out = ListDocumentsResponse {
            documents: Vec::new(),
            count: 0,
            request_charge: response.meta.request_charge,
            session_token: response.meta.session_token.clone(),
            continuation: response.meta.continuation.clone(),
            etag: response.meta.etag.clone(),
            not_modified: response.status == 304,
        };
        let empty = response.meta.content_length == Some(0) || response.body.is_empty();
        if !out.not_modified && !empty {
            let decoded: ListResponseBody<T> = response.json()?;
            out.documents = decoded.documents;
            out.count = decoded.count;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn backoff_schedule() {
        for (retry_count, exponent) in [(1usize, 1u32), (8, 8), (9, 8), (13, 8), (14, 13), (100, 13)] {
            let delay = backoff_delay(retry_count).as_millis() as u64;
            let scale = 1u64 << exponent;
            assert!(
                delay >= scale * 300 && delay < scale * 600,
                "retry {retry_count}: delay {delay}ms outside [{},{})",
                scale * 300,
                scale * 600
            );
        }
    }

    #[test]
    fn date_header_format() {
        let date = http_date(datetime!(2017-04-27 00:51:12 UTC));
        assert_eq!(date, "Thu, 27 Apr 2017 00:51:12 GMT");
    }

    #[test]
    fn success_statuses_never_map_to_errors() {
        for status in [200, 201, 204, 304] {
            let response = ApiResponse {
                status,
                meta: ResponseMeta::default(),
                body: Bytes::new(),
            };
            assert!(response.check().is_ok(), "status {status}");
        }
    }

    #[test]
    fn error_statuses_map_to_kinds() {
        let cases = [
            (400, ErrorKind::InvalidRequest),
            (404, ErrorKind::NotFound),
            (409, ErrorKind::Conflict),
            (410, ErrorKind::Gone),
            (412, ErrorKind::PreconditionFailed),
            (449, ErrorKind::RetryWith),
            (500, ErrorKind::InternalError),
            (418, ErrorKind::UnexpectedStatus),
        ];
        for (status, kind) in cases {
            let response = ApiResponse {
                status,
                meta: ResponseMeta::default(),
                body: Bytes::from_static(b"details"),
            };
            let err = response.check().unwrap_err();
            assert_eq!(err.kind(), kind, "status {status}");
        }
    }

    #[test]
    fn retriable_statuses() {
        assert!(retriable(429));
        assert!(retriable(503));
        assert!(!retriable(500));
        assert!(!retriable(408));
    }
}
