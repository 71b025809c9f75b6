//! Crawl orchestrator: bounded fan-out over keys, retries, and caching.
//!
//! [`Crawler`] owns the identity pool, the result cache, and a shared
//! transport. One call to [`Crawler::crawl`] takes a batch of targets and
//! returns exactly one outcome per distinct key; a failing key never
//! disturbs its siblings.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use rand::Rng;
use tokio::time::timeout;

use crate::cache::{CacheOptions, ResultCache};
use crate::errors::{ConfigError, CrawlError, RetryClass};
use crate::identity::IdentityPool;
use crate::models::{CrawlOutcomes, CrawlResult, RequestKey, StockRecord};
use crate::parser::{self, ExtractionSchema};
use crate::transport::Transport;

/// One unit of crawl work: what to fetch and how to read it.
#[derive(Clone, Debug)]
pub struct CrawlTarget {
    /// The resource to fetch.
    pub key: RequestKey,
    /// How to turn the response into records.
    pub schema: ExtractionSchema,
}

impl CrawlTarget {
    pub fn new(key: RequestKey, schema: ExtractionSchema) -> Self {
        Self { key, schema }
    }
}

/// Orchestrator tuning knobs.
#[derive(Clone, Debug)]
pub struct CrawlOptions {
    /// Maximum number of keys worked on concurrently.
    pub max_in_flight: usize,
    /// Budget for one key: cache wait, fetch (all attempts), and parse.
    pub per_key_timeout: Duration,
    /// Optional budget for the whole batch. Keys unfinished at the
    /// deadline resolve to [`CrawlError::Timeout`].
    pub overall_deadline: Option<Duration>,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// First retry delay; doubles per retry up to `max_backoff`.
    pub initial_backoff: Duration,
    /// Upper bound on the computed backoff delay.
    pub max_backoff: Duration,
    /// Result cache configuration.
    pub cache: CacheOptions,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_in_flight: 8,
            per_key_timeout: Duration::from_secs(30),
            overall_deadline: None,
            max_retries: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(10),
            cache: CacheOptions::default(),
        }
    }
}

impl CrawlOptions {
    /// Validate the options. Rejected synchronously, before any work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight == 0 {
            return Err(ConfigError::new("max_in_flight must be at least 1"));
        }
        if self.per_key_timeout.is_zero() {
            return Err(ConfigError::new("per_key_timeout must be non-zero"));
        }
        if self.max_backoff < self.initial_backoff {
            return Err(ConfigError::new(
                "max_backoff must be at least initial_backoff",
            ));
        }
        self.cache.validate()
    }
}

/// The fetch-parse-cache pipeline front end.
pub struct Crawler {
    transport: Arc<dyn Transport>,
    identities: IdentityPool,
    cache: ResultCache<Vec<StockRecord>, CrawlError>,
    options: CrawlOptions,
}

impl Crawler {
    /// Create a crawler with default options and the built-in identity
    /// pool.
    pub fn new(transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        Self::with_options(transport, CrawlOptions::default())
    }

    /// Create a crawler with explicit options.
    pub fn with_options(
        transport: Arc<dyn Transport>,
        options: CrawlOptions,
    ) -> Result<Self, ConfigError> {
        Self::with_identities(transport, options, IdentityPool::new())
    }

    /// Create a crawler with explicit options and identity pool.
    pub fn with_identities(
        transport: Arc<dyn Transport>,
        options: CrawlOptions,
        identities: IdentityPool,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        let cache = ResultCache::new(options.cache.clone());
        Ok(Self {
            transport,
            identities,
            cache,
            options,
        })
    }

    /// Crawl a batch of targets.
    ///
    /// Duplicate keys are collapsed (first schema wins). The returned map
    /// holds exactly one entry per distinct key, success or failure; no
    /// key is ever silently dropped.
    pub async fn crawl(&self, targets: Vec<CrawlTarget>) -> CrawlOutcomes {
        let mut unique: BTreeMap<RequestKey, ExtractionSchema> = BTreeMap::new();
        for target in targets {
            unique.entry(target.key).or_insert(target.schema);
        }
        let requested: Vec<RequestKey> = unique.keys().cloned().collect();
        info!("Crawling {} distinct keys", requested.len());

        let mut outcomes: CrawlOutcomes = BTreeMap::new();
        {
            let mut results = stream::iter(unique.into_iter().map(|(key, schema)| async move {
                let result = self.crawl_one(&key, &schema).await;
                (key, result)
            }))
            .buffer_unordered(self.options.max_in_flight);

            let collect = async {
                while let Some((key, result)) = results.next().await {
                    outcomes.insert(key, result);
                }
            };
            match self.options.overall_deadline {
                Some(deadline) => {
                    if timeout(deadline, collect).await.is_err() {
                        warn!("Crawl deadline lapsed; unfinished keys time out");
                    }
                }
                None => collect.await,
            }
        }

        for key in requested {
            outcomes.entry(key).or_insert(Err(CrawlError::Timeout));
        }
        outcomes
    }

    /// Resolve one key within its time budget, consulting the cache.
    async fn crawl_one(&self, key: &RequestKey, schema: &ExtractionSchema) -> CrawlResult {
        let work = self
            .cache
            .get_or_fetch(key, || self.fetch_and_parse(key, schema));
        match timeout(self.options.per_key_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Key {} exceeded its time budget", key);
                Err(CrawlError::Timeout)
            }
        }
    }

    /// Fetch a key with retries and parse the response.
    async fn fetch_and_parse(&self, key: &RequestKey, schema: &ExtractionSchema) -> CrawlResult {
        let mut attempts: u32 = 0;
        let mut backoff = self.options.initial_backoff;

        loop {
            attempts += 1;
            let identity = self.identities.next_identity();
            let fetched = self
                .transport
                .fetch(key, identity, self.options.per_key_timeout)
                .await;

            let error = match fetched {
                Ok(raw) => {
                    debug!("Parsing {} ({} attempts)", key, attempts);
                    return parser::parse(raw, schema).map_err(CrawlError::from);
                }
                Err(error) => error,
            };

            match error.retry_class() {
                RetryClass::Never => return Err(CrawlError::from(error)),
                RetryClass::WithBackoff => {
                    if attempts > self.options.max_retries {
                        warn!("Retries exhausted for {} after {} attempts", key, attempts);
                        return Err(CrawlError::Exhausted {
                            attempts,
                            last: Box::new(CrawlError::from(error)),
                        });
                    }
                    // An upstream Retry-After overrides our own schedule.
                    let delay = error.retry_after().unwrap_or_else(|| with_jitter(backoff));
                    debug!(
                        "Attempt {} for {} failed ({}); retrying in {:?}",
                        attempts, key, error, delay
                    );
                    tokio::time::sleep(delay).await;
                    backoff = (backoff * 2).min(self.options.max_backoff);
                }
            }
        }
    }
}

/// Spread retries out by up to half the base delay.
fn with_jitter(base: Duration) -> Duration {
    let half_ms = (base.as_millis() / 2) as u64;
    if half_ms == 0 {
        return base;
    }
    base + Duration::from_millis(rand::thread_rng().gen_range(0..half_ms))
}
