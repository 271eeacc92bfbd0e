//! Error types
//!
//! Every component of the client (codecs, the request pipeline and the task
//! poller) reports failures through the single [`Error`] enum below. Callers
//! that only care about the broad category can match on [`Error::kind`].

use crate::model::TaskStatus;
use reqwest::Method;
use std::time::Duration;
use thiserror::Error;

/// Boxed source error carried by serialization failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Phase strings attached to serialization errors
pub const PHASE_BUILD_REQUEST: &str = "failed to build request body";
pub const PHASE_DECODE_RESPONSE: &str = "failed to decode response body";
pub const PHASE_DECODE_ERROR: &str = "failed to decode error response";

/// Broad error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Serialization,
    Http,
    TaskFailed,
    Timeout,
    Transport,
}

/// Errors produced by the client
#[derive(Debug, Error)]
pub enum Error {
    /// A request body could not be encoded or a response body decoded
    #[error("{phase}: {source}")]
    Serialization {
        phase: &'static str,
        #[source]
        source: BoxError,
    },

    /// The URL-encoded codec only knows how to place a body for GET and POST
    #[error("unsupported method for url-encoded request: {0}")]
    UnsupportedMethod(Method),

    /// A request URL could not be resolved against the base URL
    #[error("invalid request url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The server answered with a non-2xx status and a decodable error payload
    #[error("{code}: {message}")]
    Http {
        status: u16,
        code: String,
        message: String,
    },

    /// The task reached FAILED or INVALID_UUID
    #[error("task {uuid} failed: {message}")]
    TaskFailed { uuid: String, message: String },

    /// The task reported a status outside the pending and target sets
    #[error("task {uuid} entered unexpected state {status}")]
    UnexpectedState { uuid: String, status: TaskStatus },

    /// The poller gave up after its deadline; the server-side task may still be running
    #[error("timeout after {timeout:?} waiting for task {uuid} (last status: {})",
        .last_status.as_ref().map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    Timeout {
        uuid: String,
        timeout: Duration,
        last_status: Option<TaskStatus>,
    },

    /// The caller cancelled the wait
    #[error("wait for task {uuid} cancelled by caller")]
    Cancelled { uuid: String },

    /// Connection-level failure (DNS, TLS, redirect loop, I/O)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl Error {
    /// Build a serialization error for the given phase
    pub fn serialization(phase: &'static str, source: impl Into<BoxError>) -> Self {
        Error::Serialization {
            phase,
            source: source.into(),
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            // An out-of-set task status is a contract mismatch, not a task failure
            Error::Serialization { .. }
            | Error::UnsupportedMethod(_)
            | Error::InvalidUrl { .. }
            | Error::UnexpectedState { .. } => ErrorKind::Serialization,
            Error::Http { .. } => ErrorKind::Http,
            Error::TaskFailed { .. } => ErrorKind::TaskFailed,
            Error::Timeout { .. } | Error::Cancelled { .. } => ErrorKind::Timeout,
            Error::Transport(_) => ErrorKind::Transport,
        }
    }

    /// HTTP status of a server-reported error
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the server says the entity does not exist.
    /// Resource callers treat this as "already deleted".
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Http { status, code, message } => {
                *status == 404
                    || code.contains("ENTITY_NOT_FOUND")
                    || message.contains("ENTITY_NOT_FOUND")
            }
            _ => false,
        }
    }

    /// True when a task lookup failed because the UUID is not visible yet
    pub fn is_unknown_uuid(&self) -> bool {
        match self {
            Error::Http { status, code, message } => {
                *status == 404 || code.contains("INVALID_UUID") || message.contains("INVALID_UUID")
            }
            _ => false,
        }
    }
}
