//! Field values decoded from stored JSON and the chain they are looked up in.
//!
//! Record values and defaults objects are JSON objects whose fields may hold
//! numbers, strings or arrays interchangeably. Each field keeps its JSON shape
//! here as a [`FieldValue`]; the accessor that consumes a field decides which
//! shapes it accepts.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::MIN_DURATION;
use crate::error::ResolveError;
use crate::error::ResolveResult;

/// A decoded defaults object or structured record value.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// One JSON field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    String(String),
    Sequence(Vec<FieldValue>),
    Mapping(FieldMap),
    Bool(bool),
    Null,
}

impl FieldValue {
    /// Name of the JSON shape, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Number(_) => "number",
            FieldValue::String(_) => "string",
            FieldValue::Sequence(_) => "array",
            FieldValue::Mapping(_) => "object",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Null => "null",
        }
    }
}

/// Ordered list of field sources, most specific first.
///
/// For a structured record this is the record's own value followed by the
/// subdomain+qtype, subdomain, qtype and zone defaults. A field is taken from
/// the first map that contains it.
#[derive(Debug, Clone)]
pub struct ValuesChain<'a> {
    maps: Vec<&'a FieldMap>,
}

impl<'a> ValuesChain<'a> {
    pub fn new(maps: Vec<&'a FieldMap>) -> Self {
        Self { maps }
    }

    /// First value of `field` along the chain.
    pub fn find(&self, field: &str) -> Option<&'a FieldValue> {
        self.maps.iter().find_map(|map| map.get(field))
    }

    /// Like [`find`](Self::find), but absence is a missing-field error.
    pub fn require(&self, field: &str) -> ResolveResult<&'a FieldValue> {
        self.find(field).ok_or_else(|| ResolveError::MissingField {
            field: field.to_string(),
        })
    }

    /// A string field.
    pub fn string(&self, field: &str) -> ResolveResult<&'a str> {
        match self.require(field)? {
            FieldValue::String(value) => Ok(value),
            _ => Err(invalid(field, "is not a string")),
        }
    }

    /// A duration field: whole seconds as a number, or a duration string.
    pub fn duration(&self, field: &str) -> ResolveResult<Duration> {
        narrow_duration(field, self.require(field)?)
    }
}

/// Convert a field value into a duration of at least one second.
///
/// Numbers are whole seconds (any fraction is dropped). Strings use the
/// `humantime` syntax: `"90s"`, `"1h"`, `"1h 30m"`, `"1h30m"`.
pub fn narrow_duration(field: &str, value: &FieldValue) -> ResolveResult<Duration> {
    let duration = match value {
        FieldValue::Number(seconds) => {
            if *seconds < 0.0 {
                return Err(invalid(field, "may not be negative"));
            }
            Duration::from_secs(seconds.trunc() as u64)
        }
        FieldValue::String(text) => humantime::parse_duration(text.trim())
            .map_err(|e| invalid(field, &format!("parse error: {e}")))?,
        _ => return Err(invalid(field, "is neither a number nor a string")),
    };
    if duration < MIN_DURATION {
        return Err(invalid(field, "must be at least one second"));
    }
    Ok(duration)
}

fn invalid(field: &str, reason: &str) -> ResolveError {
    ResolveError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
