//! Record encoders: turn a merged values chain into record content.
//!
//! Each encoder reads the fields it needs from a [`ValuesChain`] and returns
//! the textual record content together with the record's time-to-live.

use std::fmt;
use std::time::Duration;

use crate::address::parse_ipv4;
use crate::address::parse_ipv6;
use crate::constants::LABEL_SEPARATOR;
use crate::error::ResolveError;
use crate::error::ResolveResult;
use crate::value::ValuesChain;

/// Record types with a structured-value encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Soa,
    Ns,
    A,
    Aaaa,
    Ptr,
}

impl RecordType {
    /// Map a query type onto an encoder. Matching is exact (uppercase).
    pub fn from_qtype(qtype: &str) -> Option<Self> {
        match qtype {
            "SOA" => Some(Self::Soa),
            "NS" => Some(Self::Ns),
            "A" => Some(Self::A),
            "AAAA" => Some(Self::Aaaa),
            "PTR" => Some(Self::Ptr),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Soa => "SOA",
            Self::Ns => "NS",
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Ptr => "PTR",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of an encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecord {
    pub content: String,
    pub ttl: Duration,
}

/// Encode a structured value of the given type.
///
/// `qname` is the queried name, used to qualify bare host labels. `revision`
/// is the store revision of the read and becomes the SOA serial.
pub fn encode(
    record_type: RecordType,
    chain: &ValuesChain<'_>,
    qname: &str,
    revision: u64,
) -> ResolveResult<EncodedRecord> {
    match record_type {
        RecordType::Soa => soa(chain, qname, revision),
        RecordType::Ns | RecordType::Ptr => hostname(chain, qname),
        RecordType::A => a(chain),
        RecordType::Aaaa => aaaa(chain),
    }
}

/// SOA: `primary mail serial refresh retry expire neg-ttl`.
pub fn soa(chain: &ValuesChain<'_>, qname: &str, revision: u64) -> ResolveResult<EncodedRecord> {
    let primary = fqdn(name_field(chain, "primary")?, qname);
    let mail = fqdn(&encode_mail(name_field(chain, "mail")?), qname);
    let refresh = chain.duration("refresh")?;
    let retry = chain.duration("retry")?;
    let expire = chain.duration("expire")?;
    let negative_ttl = chain.duration("neg-ttl")?;
    let ttl = chain.duration("ttl")?;
    let content = format!(
        "{primary} {mail} {revision} {} {} {} {}",
        refresh.as_secs(),
        retry.as_secs(),
        expire.as_secs(),
        negative_ttl.as_secs()
    );
    Ok(EncodedRecord { content, ttl })
}

/// NS and PTR: a single fully-qualified `hostname`.
pub fn hostname(chain: &ValuesChain<'_>, qname: &str) -> ResolveResult<EncodedRecord> {
    let content = fqdn(name_field(chain, "hostname")?, qname);
    let ttl = chain.duration("ttl")?;
    Ok(EncodedRecord { content, ttl })
}

pub fn a(chain: &ValuesChain<'_>) -> ResolveResult<EncodedRecord> {
    let addr = parse_ipv4(chain.require("ip")?)?;
    let ttl = chain.duration("ttl")?;
    Ok(EncodedRecord {
        content: addr.to_string(),
        ttl,
    })
}

pub fn aaaa(chain: &ValuesChain<'_>) -> ResolveResult<EncodedRecord> {
    let addr = parse_ipv6(chain.require("ip")?)?;
    let ttl = chain.duration("ttl")?;
    Ok(EncodedRecord {
        content: addr.to_string(),
        ttl,
    })
}

/// A trimmed, non-empty name field.
fn name_field<'a>(chain: &ValuesChain<'a>, field: &str) -> ResolveResult<&'a str> {
    let name = chain.string(field)?.trim();
    if name.is_empty() {
        return Err(ResolveError::InvalidField {
            field: field.to_string(),
            reason: "is empty".to_string(),
        });
    }
    Ok(name)
}

/// Fully qualify a name.
///
/// Names ending in `.` are kept. Names containing a `.` get a trailing `.`.
/// A bare label gets the queried name appended. An escaped `\.` is part of a
/// label, so `john\.doe` is still a bare label.
pub fn fqdn(name: &str, qname: &str) -> String {
    if name.ends_with(LABEL_SEPARATOR) && !ends_escaped(name) {
        return name.to_string();
    }
    let mut out = name.to_string();
    if !has_separator(name) {
        out.push(LABEL_SEPARATOR);
        out.push_str(qname);
    }
    if !out.ends_with(LABEL_SEPARATOR) {
        out.push(LABEL_SEPARATOR);
    }
    out
}

/// Whether `name` contains a `.` that is not escaped with `\`.
fn has_separator(name: &str) -> bool {
    let mut escaped = false;
    for c in name.chars() {
        match c {
            '\\' if !escaped => escaped = true,
            LABEL_SEPARATOR if !escaped => return true,
            _ => escaped = false,
        }
    }
    false
}

/// Whether the final `.` of `name` is escaped.
fn ends_escaped(name: &str) -> bool {
    let trailing_escapes = name[..name.len() - 1].chars().rev().take_while(|&c| c == '\\').count();
    trailing_escapes % 2 == 1
}

/// SOA RNAME form of a mailbox.
///
/// `first.last@example.net` becomes `first\.last.example.net`; without an `@`
/// every dot is escaped.
pub fn encode_mail(mail: &str) -> String {
    match mail.split_once('@') {
        Some((local, domain)) => format!("{}.{domain}", local.replace('.', "\\.")),
        None => mail.replace('.', "\\."),
    }
}
