//! Core data types shared across the pipeline.

mod key;
mod record;

pub use key::RequestKey;
pub use record::{FieldValue, StockRecord};

use std::collections::BTreeMap;

use crate::errors::CrawlError;

/// Per-key crawl outcome: the parsed records, or the error that stopped
/// this key. A failure here never says anything about sibling keys.
pub type CrawlResult = Result<Vec<StockRecord>, CrawlError>;

/// The orchestrator's output: one entry per requested key, ordered by key.
pub type CrawlOutcomes = BTreeMap<RequestKey, CrawlResult>;
