//! Request identity for one fetchable target.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::endpoints::{self, RecentDay};

/// Identifier for one fetchable target plus its query parameters.
///
/// A `RequestKey` is the unit of work the crawler operates on: it names the
/// upstream resource, keys the result cache, and keys the returned outcome
/// mapping. Equality and hashing are value-based, and parameters live in a
/// `BTreeMap` so two keys built from the same inputs compare and hash
/// identically regardless of insertion order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    /// The target URL without query parameters.
    source: String,
    /// Query parameters, sorted by name.
    params: BTreeMap<String, String>,
}

impl RequestKey {
    /// Create a key for an arbitrary source URL with no parameters.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a query parameter, replacing any previous value for the name.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// The target URL without query parameters.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The query parameters, sorted by name.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Render the full URL, for logging and diagnostics.
    ///
    /// The transport layer encodes parameters itself; this rendering is
    /// informational.
    pub fn url(&self) -> String {
        if self.params.is_empty() {
            return self.source.clone();
        }
        let query: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}?{}", self.source, query.join("&"))
    }

    // ------------------------------------------------------------------
    // Well-known targets
    // ------------------------------------------------------------------

    /// TWSE disciplined-stock announcements.
    pub fn twse_punished_stocks() -> Self {
        Self::new(endpoints::TWSE_PUNISH)
    }

    /// TPEX disciplined-stock announcements.
    pub fn tpex_punished_stocks() -> Self {
        Self::new(endpoints::TPEX_PUNISH)
    }

    /// TWSE listed-company profiles.
    pub fn twse_company_info() -> Self {
        Self::new(endpoints::TWSE_COMPANY_INFO)
    }

    /// TPEX company profiles.
    pub fn tpex_company_info() -> Self {
        Self::new(endpoints::TPEX_COMPANY_INFO)
    }

    /// Fubon main-force detail for one stock over a lookback window.
    pub fn fubon_main_force(stock_id: &str, day: RecentDay) -> Self {
        Self::new(endpoints::FUBON_MAIN_FORCE)
            .with_param("a", stock_id)
            .with_param("d", day.query_value())
    }

    /// Fubon main-force detail for one stock on a single trading day.
    ///
    /// The upstream scopes single-day queries with an equal from/to date
    /// range instead of a lookback window code.
    pub fn fubon_main_force_on(stock_id: &str, date: NaiveDate) -> Self {
        let date = date.format("%Y-%m-%d").to_string();
        Self::new(endpoints::FUBON_MAIN_FORCE)
            .with_param("a", stock_id)
            .with_param("e", date.clone())
            .with_param("f", date)
    }

    /// MOPS material-information announcements for all listed companies.
    pub fn mops_news() -> Self {
        Self::new(endpoints::MOPS_NEWS)
    }

    /// MoneyDJ stock category index.
    pub fn moneydj_categories() -> Self {
        Self::new(endpoints::MONEYDJ_STOCK_CATEGORY)
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_value_based() {
        let a = RequestKey::new("https://example.com/data")
            .with_param("id", "2330")
            .with_param("day", "1");
        let b = RequestKey::new("https://example.com/data")
            .with_param("day", "1")
            .with_param("id", "2330");
        assert_eq!(a, b);

        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn test_url_rendering() {
        let key = RequestKey::new("https://example.com/data").with_param("id", "2330");
        assert_eq!(key.url(), "https://example.com/data?id=2330");

        let bare = RequestKey::new("https://example.com/data");
        assert_eq!(bare.url(), "https://example.com/data");
    }

    #[test]
    fn test_param_replacement() {
        let key = RequestKey::new("https://example.com")
            .with_param("id", "2330")
            .with_param("id", "2317");
        assert_eq!(key.params().get("id").map(String::as_str), Some("2317"));
    }

    #[test]
    fn test_fubon_main_force_key() {
        let key = RequestKey::fubon_main_force("2330", RecentDay::Five);
        assert_eq!(key.source(), endpoints::FUBON_MAIN_FORCE);
        assert_eq!(key.params().get("a").map(String::as_str), Some("2330"));
        assert_eq!(key.params().get("d").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_fubon_main_force_single_day_key() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let key = RequestKey::fubon_main_force_on("2330", date);
        assert_eq!(key.source(), endpoints::FUBON_MAIN_FORCE);
        assert_eq!(key.params().get("a").map(String::as_str), Some("2330"));
        assert_eq!(
            key.params().get("e").map(String::as_str),
            Some("2024-01-02")
        );
        assert_eq!(key.params().get("e"), key.params().get("f"));
    }
}
