//! Document parser: raw response bytes in, typed stock records out.
//!
//! Parsing is pure - no I/O, no shared state. An HTML payload becomes a
//! document tree and the schema's CSS selectors are applied in order; a
//! JSON payload is read as flat objects whose keys the schema's selectors
//! name. Either way, matched text is coerced to each field's declared
//! type.
//!
//! Failure policy:
//! - A payload that cannot become a document at all is
//!   [`ParseError::MalformedDocument`].
//! - In single-record mode a required miss or bad coercion fails the parse
//!   with [`ParseError::FieldMissing`] / [`ParseError::TypeMismatch`].
//! - In multi-record mode one bad record is dropped and its siblings
//!   survive; only optional-field gaps become [`FieldValue::Missing`].

mod schema;

pub use schema::{
    DateFormat, DocumentKind, ExtractionSchema, FieldRule, FieldType, SymbolRule, Unit,
};

use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::errors::ParseError;
use crate::models::{FieldValue, StockRecord};
use crate::transport::RawResponse;
use crate::util::roc_to_western_date;

/// Parse a response body into stock records according to `schema`.
pub fn parse(raw: RawResponse, schema: &ExtractionSchema) -> Result<Vec<StockRecord>, ParseError> {
    match schema.kind {
        DocumentKind::Html => parse_html(&raw, schema),
        DocumentKind::Json => parse_json(&raw, schema),
    }
}

fn parse_html(raw: &RawResponse, schema: &ExtractionSchema) -> Result<Vec<StockRecord>, ParseError> {
    let compiled = CompiledSchema::compile(schema)?;

    let text = std::str::from_utf8(&raw.body).map_err(|_| ParseError::MalformedDocument)?;
    if text.trim().is_empty() {
        return Err(ParseError::MalformedDocument);
    }
    let document = Html::parse_document(text);

    match &compiled.record {
        None => {
            // Whole document is one record; misses are hard errors.
            Ok(vec![extract_record(document.root_element(), &compiled, true)?])
        }
        Some(record_selector) => {
            let mut records = Vec::new();
            for element in document.select(record_selector) {
                match extract_record(element, &compiled, false) {
                    Ok(record) => records.push(record),
                    Err(e) => debug!("Dropping record: {}", e),
                }
            }
            Ok(records)
        }
    }
}

/// Parse a JSON payload: an array of objects yields one record per
/// element (bad elements dropped), a single object yields one record with
/// strict misses.
fn parse_json(raw: &RawResponse, schema: &ExtractionSchema) -> Result<Vec<StockRecord>, ParseError> {
    let value: Value =
        serde_json::from_slice(&raw.body).map_err(|_| ParseError::MalformedDocument)?;

    match value {
        Value::Array(items) => {
            let mut records = Vec::new();
            for item in items {
                match json_record(&item, schema, false) {
                    Ok(record) => records.push(record),
                    Err(e) => debug!("Dropping record: {}", e),
                }
            }
            Ok(records)
        }
        Value::Object(_) => Ok(vec![json_record(&value, schema, true)?]),
        _ => Err(ParseError::MalformedDocument),
    }
}

fn json_record(
    value: &Value,
    schema: &ExtractionSchema,
    strict: bool,
) -> Result<StockRecord, ParseError> {
    let object = value.as_object().ok_or(ParseError::MalformedDocument)?;

    let symbol = match &schema.symbol {
        SymbolRule::Fixed(s) => s.clone(),
        SymbolRule::Selector(key) => json_text(object.get(key.as_str())).unwrap_or_default(),
    };
    if symbol.is_empty() {
        return Err(ParseError::FieldMissing("symbol".to_string()));
    }

    let mut record = StockRecord::new(symbol);
    for rule in &schema.fields {
        let text = json_text(object.get(rule.selector.as_str()));
        insert_field(&mut record, rule, text, strict)?;
    }
    Ok(record)
}

/// Render a JSON scalar as field text. Null, absent, and non-scalar
/// values all read as missing.
fn json_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Schema with its selectors compiled, so selector errors surface before
/// any document work.
struct CompiledSchema<'a> {
    record: Option<Selector>,
    symbol: CompiledSymbol,
    fields: Vec<(&'a FieldRule, Selector)>,
}

enum CompiledSymbol {
    Selector(Selector),
    Fixed(String),
}

impl<'a> CompiledSchema<'a> {
    fn compile(schema: &'a ExtractionSchema) -> Result<Self, ParseError> {
        let record = schema
            .record_selector
            .as_deref()
            .map(compile_selector)
            .transpose()?;

        let symbol = match &schema.symbol {
            SymbolRule::Selector(s) => CompiledSymbol::Selector(compile_selector(s)?),
            SymbolRule::Fixed(s) => CompiledSymbol::Fixed(s.clone()),
        };

        let mut fields = Vec::with_capacity(schema.fields.len());
        for rule in &schema.fields {
            fields.push((rule, compile_selector(&rule.selector)?));
        }

        Ok(Self {
            record,
            symbol,
            fields,
        })
    }
}

fn compile_selector(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|_| ParseError::InvalidSelector(selector.to_string()))
}

/// Extract one record from `scope`.
///
/// An empty or missing symbol is always an error; in multi-record mode
/// the caller drops the record instead of failing the batch. `strict`
/// (single-record mode) additionally turns optional-field coercion
/// failures into errors.
fn extract_record(
    scope: ElementRef<'_>,
    compiled: &CompiledSchema<'_>,
    strict: bool,
) -> Result<StockRecord, ParseError> {
    let symbol = match &compiled.symbol {
        CompiledSymbol::Fixed(s) => s.clone(),
        CompiledSymbol::Selector(selector) => scope
            .select(selector)
            .next()
            .map(element_text)
            .unwrap_or_default(),
    };
    if symbol.is_empty() {
        return Err(ParseError::FieldMissing("symbol".to_string()));
    }

    let mut record = StockRecord::new(symbol);
    for (rule, selector) in &compiled.fields {
        let text = scope
            .select(selector)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty());
        insert_field(&mut record, rule, text, strict)?;
    }

    Ok(record)
}

/// Coerce field text and store it, applying the required/optional policy.
fn insert_field(
    record: &mut StockRecord,
    rule: &FieldRule,
    text: Option<String>,
    strict: bool,
) -> Result<(), ParseError> {
    let value = match text {
        None => {
            if rule.required {
                return Err(ParseError::FieldMissing(rule.name.clone()));
            }
            FieldValue::Missing
        }
        Some(text) => match coerce(&text, rule.ty) {
            Some(value) => value,
            None => {
                if rule.required || strict {
                    return Err(ParseError::TypeMismatch(rule.name.clone()));
                }
                FieldValue::Missing
            }
        },
    };
    record.fields.insert(rule.name.clone(), value);
    Ok(())
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Coerce field text to its declared type. `None` means type mismatch.
fn coerce(text: &str, ty: FieldType) -> Option<FieldValue> {
    match ty {
        FieldType::Text => Some(FieldValue::Text(text.to_string())),
        FieldType::Integer => clean_number(text, Unit::Plain)
            .parse::<i64>()
            .ok()
            .map(FieldValue::Integer),
        FieldType::Decimal { unit } => clean_number(text, unit)
            .parse::<Decimal>()
            .ok()
            .map(FieldValue::Decimal),
        FieldType::Date { format } => parse_date(text, format).map(FieldValue::Date),
    }
}

/// Strip decorations from numeric text before strict parsing.
///
/// Thousands separators are always removed; percent and currency
/// decorations only when the schema declared that unit, so a stray `%` on
/// a plain field still reads as a type mismatch.
fn clean_number(text: &str, unit: Unit) -> String {
    let mut cleaned = text.trim().replace(',', "");
    match unit {
        Unit::Plain => {}
        Unit::Percent => {
            cleaned = cleaned.trim_end_matches('%').trim().to_string();
        }
        Unit::Currency => {
            for token in ["NT$", "US$", "$", "元"] {
                cleaned = cleaned.replace(token, "");
            }
            cleaned = cleaned.trim().to_string();
        }
    }
    cleaned
}

fn parse_date(text: &str, format: DateFormat) -> Option<NaiveDate> {
    match format {
        DateFormat::Iso => NaiveDate::parse_from_str(text, "%Y-%m-%d").ok(),
        DateFormat::SlashYmd => NaiveDate::parse_from_str(text, "%Y/%m/%d").ok(),
        DateFormat::Roc => roc_to_western_date(text),
    }
}
