//! HTTP transport: one request, one typed result.
//!
//! The [`Transport`] trait is the seam between the orchestrator and the
//! network. The real implementation is [`HttpTransport`] on top of a shared
//! reqwest client; tests substitute stubs. A transport performs exactly one
//! request/response cycle - retry policy lives in the orchestrator, never
//! here.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::header;

use crate::errors::TransportError;
use crate::models::RequestKey;

/// The raw result of one HTTP fetch.
///
/// Owned transiently: the transport hands it to the parser by value and it
/// is dropped once records have been extracted.
#[derive(Clone, Debug)]
pub struct RawResponse {
    /// HTTP status code of the final response.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
    /// URL the response actually came from, after redirects.
    pub final_url: String,
    /// When the response was received.
    pub fetched_at: DateTime<Utc>,
}

/// A single-request HTTP client.
///
/// Implementations must apply `timeout` to the full request/response cycle
/// and map failures into [`TransportError`] without retrying.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one fetch for `key`, presenting `identity` as the
    /// User-Agent.
    async fn fetch(
        &self,
        key: &RequestKey,
        identity: &str,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError>;
}

/// Production transport backed by a shared reqwest client.
///
/// The client is created once so connections are reused across calls;
/// reuse is an optimization, not something callers may rely on.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a fresh connection pool.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(TransportError::from)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(
        &self,
        key: &RequestKey,
        identity: &str,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        debug!("Fetching {}", key);

        let response = self
            .client
            .get(key.source())
            .query(key.params())
            .header(header::USER_AGENT, identity)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                code: status.as_u16(),
                retry_after: parse_retry_after(response.headers()),
            });
        }

        let final_url = response.url().to_string();
        let body = response.bytes().await?.to_vec();

        debug!("Fetched {} ({} bytes)", final_url, body.len());

        Ok(RawResponse {
            status: status.as_u16(),
            body,
            final_url,
            fetched_at: Utc::now(),
        })
    }
}

/// Extract a `Retry-After` delay from response headers.
///
/// Only the delta-seconds form is honored; the HTTP-date form is rare on
/// the targeted sites and falls back to the crawler's own backoff.
fn parse_retry_after(headers: &header::HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
