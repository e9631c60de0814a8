use std::fmt;

use crate::http::QUERY_CONTENT_TYPE;

/// The root cause of an [`Error`], independent of any contextual wrapping
/// added along the way.
///
/// Layers above the request layer may wrap an error with extra context (for
/// example the document id and partition key value); [`Error::kind`] digs
/// through that wrapping so callers can always test for the underlying
/// condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 400: the JSON, SQL, or JavaScript in the request body is invalid.
    InvalidRequest,
    /// 401: the authorization header is invalid for the requested resource.
    Unauthorized,
    /// 403: the authorization token expired, a resource quota has been
    /// reached or resource usage is high.
    Forbidden,
    /// 404: the resource no longer exists.
    NotFound,
    /// 408: the operation did not complete within the allotted amount of
    /// time. Not retried automatically; the service does not consider the
    /// operation idempotent.
    Timeout,
    /// 409: the id provided has been taken by an existing resource.
    Conflict,
    /// 410: the resource is gone. A known scenario is reading a feed from a
    /// partition-key range that was split.
    Gone,
    /// 412: the operation specified an etag that is different from the
    /// version available at the server.
    PreconditionFailed,
    /// 413: the document size exceeded the allowable size for a request.
    TooLarge,
    /// 429: the collection has exceeded the provisioned throughput limit.
    TooManyRequests,
    /// 449: the operation encountered a transient error and is safe to
    /// retry.
    RetryWith,
    /// 500: the operation failed due to an unexpected service error.
    InternalError,
    /// 503: the operation could not be completed because the service was
    /// unavailable.
    Unavailable,
    /// Any other status outside the mapping table. 2xx and 304 are always
    /// success and never produce this.
    UnexpectedStatus,

    /// The master key is not valid base64.
    InvalidKey,
    /// The partition key value is not a null, string or integer.
    InvalidPartitionKeyType,
    /// A query was attempted with a content type other than
    /// `application/query+json`.
    WrongQueryContentType,
    /// All 429/503 retries were exhausted in the request layer.
    MaxRetriesExceeded,
    /// Optimistic concurrency control did not succeed within the conflict
    /// retry budget.
    Contention,
    /// An entity was queued for put that was not fetched first in the same
    /// transaction.
    PutWithoutGet,
    /// Fetching more than one distinct entity in a transaction is not
    /// supported.
    NotImplemented,
    /// A transaction was started with a conflict retry budget of zero.
    RetriesZero,
    /// The rollback sentinel. Never surfaced by [`Session::transaction`];
    /// see [`Error::Rollback`].
    ///
    /// [`Session::transaction`]: crate::session::Session::transaction
    Rollback,
    /// The operation was cancelled through its cancellation token.
    Cancelled,
    /// A transport-level HTTP error.
    Http,
    /// A JSON serialization or deserialization error.
    Json,
}

impl ErrorKind {
    /// Maps an HTTP status to its error kind. Returns `None` for statuses
    /// with no mapping; success statuses are not handled here.
    pub(crate) fn from_status(status: u16) -> Option<ErrorKind> {
        match status {
            400 => Some(ErrorKind::InvalidRequest),
            401 => Some(ErrorKind::Unauthorized),
            403 => Some(ErrorKind::Forbidden),
            404 => Some(ErrorKind::NotFound),
            408 => Some(ErrorKind::Timeout),
            409 => Some(ErrorKind::Conflict),
            410 => Some(ErrorKind::Gone),
            412 => Some(ErrorKind::PreconditionFailed),
            413 => Some(ErrorKind::TooLarge),
            429 => Some(ErrorKind::TooManyRequests),
            449 => Some(ErrorKind::RetryWith),
            500 => Some(ErrorKind::InternalError),
            503 => Some(ErrorKind::Unavailable),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidRequest => "invalid request",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Gone => "gone",
            ErrorKind::PreconditionFailed => "precondition failed",
            ErrorKind::TooLarge => "too large",
            ErrorKind::TooManyRequests => "too many requests",
            ErrorKind::RetryWith => "retry with",
            ErrorKind::InternalError => "internal error",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::UnexpectedStatus => "unexpected http status",
            ErrorKind::InvalidKey => "invalid key",
            ErrorKind::InvalidPartitionKeyType => "invalid partition key type",
            ErrorKind::WrongQueryContentType => "wrong query content type",
            ErrorKind::MaxRetriesExceeded => "max retries exceeded",
            ErrorKind::Contention => "contention",
            ErrorKind::PutWithoutGet => "put without get",
            ErrorKind::NotImplemented => "not implemented",
            ErrorKind::RetriesZero => "retries zero",
            ErrorKind::Rollback => "rollback",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Http => "http",
            ErrorKind::Json => "json",
        };
        f.write_str(name)
    }
}

/// Errors produced by this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An error response from the service, mapped from the HTTP status.
    #[error("{kind} (http status {status}): {message}")]
    Service {
        kind: ErrorKind,
        status: u16,
        message: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("master key is not valid base64")]
    InvalidKey(#[source] base64::DecodeError),

    #[error("partition key must be a null, string or integer value")]
    InvalidPartitionKeyType,

    #[error("wrong content type for query, must be {QUERY_CONTENT_TYPE}")]
    WrongQueryContentType,

    #[error("must specify a partition key when offer throughput is >= 10000")]
    ThroughputRequiresPartitionKey,

    #[error("max retries exceeded")]
    MaxRetriesExceeded,

    #[error("optimistic concurrency control did not succeed after all the retries")]
    Contention,

    #[error("attempting to put an entity that has not been fetched first")]
    PutWithoutGet,

    #[error("fetching more than one entity in a transaction is not supported")]
    NotImplemented,

    #[error("number of conflict retries set to 0")]
    RetriesZero,

    /// The rollback sentinel. Return this from a transaction closure to
    /// abandon a queued put; the transaction then completes without a commit
    /// and without an error. Only the exact sentinel is treated as rollback,
    /// a wrapped one is surfaced like any other error.
    #[error("transaction rolled back")]
    Rollback,

    #[error("operation cancelled")]
    Cancelled,

    /// Contextual wrapping; the underlying kind is preserved.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// The root cause of this error, looking through contextual wrapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Service { kind, .. } => *kind,
            Error::Http(_) => ErrorKind::Http,
            Error::Json(_) => ErrorKind::Json,
            Error::InvalidKey(_) => ErrorKind::InvalidKey,
            Error::InvalidPartitionKeyType => ErrorKind::InvalidPartitionKeyType,
            Error::WrongQueryContentType => ErrorKind::WrongQueryContentType,
            Error::ThroughputRequiresPartitionKey => ErrorKind::InvalidRequest,
            Error::MaxRetriesExceeded => ErrorKind::MaxRetriesExceeded,
            Error::Contention => ErrorKind::Contention,
            Error::PutWithoutGet => ErrorKind::PutWithoutGet,
            Error::NotImplemented => ErrorKind::NotImplemented,
            Error::RetriesZero => ErrorKind::RetriesZero,
            Error::Rollback => ErrorKind::Rollback,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Context { source, .. } => source.kind(),
        }
    }

    /// True when the root cause of this error is `kind`.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    pub(crate) fn context(self, context: impl Into<String>) -> Error {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ErrorKind::from_status(404), Some(ErrorKind::NotFound));
        assert_eq!(ErrorKind::from_status(412), Some(ErrorKind::PreconditionFailed));
        assert_eq!(ErrorKind::from_status(449), Some(ErrorKind::RetryWith));
        assert_eq!(ErrorKind::from_status(418), None);
    }

    #[test]
    fn kind_is_preserved_through_context() {
        let err = Error::Service {
            kind: ErrorKind::NotFound,
            status: 404,
            message: "gone fishing".into(),
        };
        let wrapped = err.context("id='a' partition key value='b'");
        assert_eq!(wrapped.kind(), ErrorKind::NotFound);
        assert!(wrapped.is(ErrorKind::NotFound));
        assert!(wrapped.to_string().contains("id='a'"));
    }
}
