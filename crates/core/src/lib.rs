//! Stockcrawl Core
//!
//! This crate provides an asynchronous fetch-parse-cache pipeline for
//! Taiwan stock-market pages and open-data endpoints.
//!
//! # Overview
//!
//! The core crate supports:
//! - Identity rotation: realistic browser User-Agents, round-robin
//! - Single-request HTTP transport with typed failures
//! - Declarative, selector-driven extraction of typed stock records
//! - A TTL + LRU result cache with single-flight request coalescing
//! - A crawl orchestrator with bounded fan-out, retries, and deadlines
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |    CrawlTarget   | --> |    RequestKey    |  (canonical identity)
//! +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |     Crawler      |  (fan-out, retries)
//!                          +------------------+
//!                             |            |
//!                             v            v
//!                   +-------------+   +-------------+
//!                   | ResultCache |   |  Transport  |  (single-flight)
//!                   +-------------+   +-------------+
//!                                          |
//!                                          v
//!                                  +------------------+
//!                                  |      parse       |  (schema-driven)
//!                                  +------------------+
//!                                          |
//!                                          v
//!                                  +------------------+
//!                                  |   StockRecord    |  (typed fields)
//!                                  +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`RequestKey`] - Identity of one fetchable target
//! - [`StockRecord`] / [`FieldValue`] - Parsed, typed record data
//! - [`ExtractionSchema`] - Declarative selector-to-field mapping
//! - [`Crawler`] / [`CrawlOptions`] - Batch orchestration
//! - [`ResultCache`] / [`CacheOptions`] - Outcome caching
//! - [`Transport`] / [`HttpTransport`] - The network seam

pub mod cache;
pub mod crawler;
pub mod endpoints;
pub mod errors;
pub mod identity;
pub mod models;
pub mod parser;
pub mod schemas;
pub mod transport;

mod util;

// Re-export the model types
pub use models::{CrawlOutcomes, CrawlResult, FieldValue, RequestKey, StockRecord};

// Re-export error and classification types
pub use errors::{ConfigError, CrawlError, ParseError, RetryClass, TransportError};

// Re-export the pipeline building blocks
pub use cache::{CacheOptions, ResultCache};
pub use crawler::{CrawlOptions, CrawlTarget, Crawler};
pub use endpoints::RecentDay;
pub use identity::{IdentityPool, DEFAULT_IDENTITY};
pub use parser::{
    parse, DateFormat, DocumentKind, ExtractionSchema, FieldRule, FieldType, SymbolRule, Unit,
};
pub use transport::{HttpTransport, RawResponse, Transport};
