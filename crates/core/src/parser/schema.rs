//! Declarative extraction schemas.
//!
//! A schema maps CSS selectors to typed record fields, keeping per-site
//! knowledge as pure data. The parser consumes schemas generically; it has
//! no idea which upstream a schema describes.

use serde::{Deserialize, Serialize};

/// Wire format of the fetched document.
///
/// Selectors are CSS for HTML documents and top-level object keys for
/// JSON documents.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// HTML tree addressed with CSS selectors.
    #[default]
    Html,
    /// JSON payload addressed with object keys. An array of objects
    /// yields one record per element; a single object yields one record.
    Json,
}

/// Unit decoration expected around a numeric field's text.
///
/// Declares which suffixes/symbols the coercion step strips before
/// parsing. Thousands separators are always stripped.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Bare number.
    #[default]
    Plain,
    /// Percentage, e.g. `12.34%`.
    Percent,
    /// Currency-decorated, e.g. `NT$1,234` or `1,234元`.
    Currency,
}

/// Date layouts the coercion step understands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// `2024-01-02`.
    Iso,
    /// `2024/01/02`.
    SlashYmd,
    /// ROC calendar, `1130102`.
    Roc,
}

/// Declared type of a record field.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldType {
    /// Decimal number with a unit decoration.
    Decimal {
        /// Decoration to strip before parsing.
        unit: Unit,
    },
    /// Integer count.
    Integer,
    /// Free text.
    Text,
    /// Calendar date.
    Date {
        /// Layout of the date text.
        format: DateFormat,
    },
}

/// One field extraction rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Field name in the resulting record.
    pub name: String,
    /// CSS selector locating the field's element.
    pub selector: String,
    /// Declared value type.
    pub ty: FieldType,
    /// Whether a record without this field is dropped.
    pub required: bool,
}

impl FieldRule {
    /// A required field.
    pub fn required(name: impl Into<String>, selector: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            ty,
            required: true,
        }
    }

    /// An optional field; a miss becomes `FieldValue::Missing`.
    pub fn optional(name: impl Into<String>, selector: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            ty,
            required: false,
        }
    }
}

/// Where a record's symbol comes from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SymbolRule {
    /// Extract the symbol text via a selector, per record.
    Selector(String),
    /// Every record in the document belongs to this symbol. Typical when
    /// the request itself was scoped to one stock.
    Fixed(String),
}

/// Declarative mapping from document structure to stock records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSchema {
    /// Document format the selectors address.
    #[serde(default)]
    pub kind: DocumentKind,
    /// Selector for the repeating record element. `None` means the whole
    /// document is one record. Ignored for JSON documents, where the
    /// payload's own shape decides.
    pub record_selector: Option<String>,
    /// Symbol source for each record.
    pub symbol: SymbolRule,
    /// Field rules, applied in order.
    pub fields: Vec<FieldRule>,
}

impl ExtractionSchema {
    /// Schema producing one record per element matching `record_selector`.
    pub fn for_records(record_selector: impl Into<String>, symbol: SymbolRule) -> Self {
        Self {
            kind: DocumentKind::Html,
            record_selector: Some(record_selector.into()),
            symbol,
            fields: Vec::new(),
        }
    }

    /// Schema treating the whole document as a single record.
    pub fn single(symbol: SymbolRule) -> Self {
        Self {
            kind: DocumentKind::Html,
            record_selector: None,
            symbol,
            fields: Vec::new(),
        }
    }

    /// Schema over a JSON payload of flat objects.
    pub fn json(symbol: SymbolRule) -> Self {
        Self {
            kind: DocumentKind::Json,
            record_selector: None,
            symbol,
            fields: Vec::new(),
        }
    }

    /// Append a field rule.
    pub fn with_field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }
}
