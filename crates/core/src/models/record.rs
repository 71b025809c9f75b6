//! Parsed stock records and their field values.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single typed field value extracted from a document.
///
/// `Missing` is the explicit representation for an optional field whose
/// selector matched nothing - distinct from zero, the empty string, or the
/// field being absent from the map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// A decimal number (prices, ratios, percentages).
    Decimal(Decimal),
    /// An integer count (volumes, share counts).
    Integer(i64),
    /// Free text (names, titles).
    Text(String),
    /// A calendar date.
    Date(NaiveDate),
    /// The field was declared but its selector matched nothing.
    Missing,
}

impl FieldValue {
    /// True if this value is the explicit missing marker.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// One parsed stock record: a symbol plus typed field values.
///
/// Records are owned by the crawl result that produced them. The symbol is
/// never empty in a record that appears in a successful result - records
/// without a usable symbol are dropped during parsing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    /// Stock symbol, e.g. "2330".
    pub symbol: String,
    /// Extracted fields keyed by schema field name.
    pub fields: BTreeMap<String, FieldValue>,
}

impl StockRecord {
    /// Create a record with no fields yet.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Look up a field by name. Absent and `Missing` both yield `None`.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).filter(|v| !v.is_missing())
    }

    /// The field's decimal value, if it is present and decimal-typed.
    pub fn decimal(&self, name: &str) -> Option<Decimal> {
        match self.field(name)? {
            FieldValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// The field's integer value, if it is present and integer-typed.
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.field(name)? {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// The field's text value, if it is present and text-typed.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.field(name)? {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The field's date value, if it is present and date-typed.
    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        match self.field(name)? {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}
