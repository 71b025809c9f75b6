//! Error types and retry classification for the crawl pipeline.
//!
//! This module provides:
//! - [`TransportError`]: failures from a single HTTP request
//! - [`ParseError`]: failures turning a response body into records
//! - [`CrawlError`]: the per-key outcome error surfaced by the orchestrator
//! - [`ConfigError`]: invalid options, rejected before any work starts
//! - [`RetryClass`]: classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use std::time::Duration;

use thiserror::Error;

/// Errors from the transport layer - one HTTP request/response cycle.
///
/// The transport never retries; classification via
/// [`retry_class`](Self::retry_class) tells the orchestrator whether a
/// further attempt is worthwhile.
///
/// All variants are cheap to clone so failed outcomes can be held in the
/// result cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The full request/response cycle exceeded the allotted timeout.
    #[error("Request timed out")]
    Timeout,

    /// The upstream answered with a non-2xx status.
    ///
    /// `retry_after` carries the upstream's `Retry-After` hint, when one
    /// was present on a 429 or 503 response.
    #[error("HTTP status {code}")]
    HttpStatus {
        /// The HTTP status code.
        code: u16,
        /// Upstream-requested wait before the next attempt.
        retry_after: Option<Duration>,
    },

    /// A connection-level failure: DNS, TLS, refused connection, or the
    /// connection dropping mid-body.
    #[error("Network error: {message}")]
    Network {
        /// Description of the underlying failure.
        message: String,
    },
}

impl TransportError {
    /// Returns the retry classification for this error.
    ///
    /// - 5xx and 429 responses and connection failures are transient:
    ///   [`RetryClass::WithBackoff`].
    /// - Other 4xx responses are permanent for this key: [`RetryClass::Never`].
    /// - A timeout is not retried either - the per-key budget that produced
    ///   it has already been spent.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Timeout => RetryClass::Never,
            Self::HttpStatus { code, .. } => {
                if *code == 429 || (500..600).contains(code) {
                    RetryClass::WithBackoff
                } else {
                    RetryClass::Never
                }
            }
            Self::Network { .. } => RetryClass::WithBackoff,
        }
    }

    /// The `Retry-After` hint attached to this error, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::HttpStatus { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::HttpStatus {
                code: status.as_u16(),
                retry_after: None,
            }
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

/// Errors from the markup parser.
///
/// Parsing is pure, so these are always permanent for the document that
/// produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The response body could not be turned into a document tree at all.
    #[error("Malformed document")]
    MalformedDocument,

    /// A schema selector is not valid CSS. Caller bug, reported before any
    /// document work happens.
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// A required field's selector matched nothing.
    #[error("Required field missing: {0}")]
    FieldMissing(String),

    /// A field's text could not be coerced to its declared type.
    #[error("Type mismatch for field: {0}")]
    TypeMismatch(String),
}

/// The per-key error surfaced in a crawl result.
///
/// Transport and parse failures are local to one key and never abort
/// sibling keys; the orchestrator wraps them here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrawlError {
    /// The per-key budget (fetch + parse, including retries and any
    /// single-flight wait) or the overall crawl deadline lapsed.
    #[error("Crawl timed out")]
    Timeout,

    /// A transport failure that was not worth retrying.
    #[error("Transport failed: {0}")]
    Transport(#[from] TransportError),

    /// The document fetched fine but could not be parsed.
    #[error("Parse failed: {0}")]
    Parse(#[from] ParseError),

    /// Retries were exhausted. Carries the last observed error so callers
    /// can distinguish permanent from transient exhaustion.
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    Exhausted {
        /// Total number of transport attempts made.
        attempts: u32,
        /// The error observed on the final attempt.
        last: Box<CrawlError>,
    },
}

impl CrawlError {
    /// Returns the retry classification for this error.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Timeout => RetryClass::Never,
            Self::Transport(e) => e.retry_class(),
            Self::Parse(_) => RetryClass::Never,
            Self::Exhausted { .. } => RetryClass::Never,
        }
    }

    /// The `Retry-After` hint attached to this error, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Transport(e) => e.retry_after(),
            _ => None,
        }
    }
}

/// Invalid crawler configuration.
///
/// This is the only fatal condition the crate reports outside of a crawl
/// result mapping, and it is raised synchronously before any work starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid configuration: {message}")]
pub struct ConfigError {
    /// Description of the rejected option.
    pub message: String,
}

impl ConfigError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
