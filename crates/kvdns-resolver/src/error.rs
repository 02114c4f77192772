//! Error types for the resolution engine.
//!
//! On the wire every failure is a flat message. Internally each error also
//! carries an [`ErrorKind`] so callers can log or react per class without
//! parsing strings.

use std::fmt;

use kvdns_core::KeyValueStoreError;
use snafu::Snafu;

/// Coarse classification of resolution failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The store could not be read (unreachable, failed or timed out).
    StoreUnavailable,
    /// A stored value could not be decoded.
    Decode,
    /// A required field is absent from the value and every defaults scope.
    MissingField,
    /// A field is present but has the wrong shape or an out-of-range value.
    InvalidValue,
    /// Structured data exists for a query type without an encoder.
    UnsupportedType,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::StoreUnavailable => "store-unavailable",
            ErrorKind::Decode => "decode-error",
            ErrorKind::MissingField => "missing-field",
            ErrorKind::InvalidValue => "invalid-value",
            ErrorKind::UnsupportedType => "unsupported-type",
        };
        f.write_str(name)
    }
}

/// Errors that abort a lookup.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ResolveError {
    /// Reading from the backing store failed.
    #[snafu(display("{source}"))]
    Store {
        source: KeyValueStoreError,
    },

    /// A stored value is not valid JSON of the expected shape.
    #[snafu(display("failed to decode '{key}': {source}"))]
    Decode {
        /// Store key holding the bad value.
        key: String,
        source: serde_json::Error,
    },

    /// A record value is not valid UTF-8.
    #[snafu(display("value of '{key}' is not valid UTF-8"))]
    NotUtf8 {
        /// Store key holding the bad value.
        key: String,
    },

    /// A record key holds an empty value.
    #[snafu(display("empty value ({key})"))]
    EmptyValue {
        /// Store key holding the empty value.
        key: String,
    },

    /// A field is missing from the value and all defaults.
    #[snafu(display("missing '{field}'"))]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// A field has the wrong type or an unusable value.
    #[snafu(display("'{field}' {reason}"))]
    InvalidField {
        /// Name of the offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An `ip` field could not be turned into an address.
    #[snafu(display("invalid {family}: {reason}"))]
    InvalidAddress {
        /// `IPv4` or `IPv6`.
        family: &'static str,
        /// What is wrong with the input.
        reason: String,
    },

    /// Structured data was found for a query type without an encoder.
    #[snafu(display("unknown/unimplemented qtype '{qtype}', but have (JSON) object data for it ({key})"))]
    UnsupportedType {
        /// The query type of the entry.
        qtype: String,
        /// Store key of the entry.
        key: String,
    },
}

impl ResolveError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::Store { .. } => ErrorKind::StoreUnavailable,
            ResolveError::Decode { .. } | ResolveError::NotUtf8 { .. } => ErrorKind::Decode,
            ResolveError::MissingField { .. } => ErrorKind::MissingField,
            ResolveError::EmptyValue { .. }
            | ResolveError::InvalidField { .. }
            | ResolveError::InvalidAddress { .. } => ErrorKind::InvalidValue,
            ResolveError::UnsupportedType { .. } => ErrorKind::UnsupportedType,
        }
    }
}

impl From<KeyValueStoreError> for ResolveError {
    fn from(source: KeyValueStoreError) -> Self {
        ResolveError::Store { source }
    }
}

/// Result type for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;
