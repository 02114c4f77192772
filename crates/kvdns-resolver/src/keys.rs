//! Key-space model: where a query's records and defaults live in the store.
//!
//! Given a prefix of `/dns`, zone `example.net`, subdomain `www` and qtype `A`:
//!
//! | What | Key |
//! |------|-----|
//! | records (prefix scan) | `/dns/example.net/www/A/` |
//! | zone defaults | `/dns/example.net/-defaults` |
//! | zone+subdomain defaults | `/dns/example.net/www/-defaults` |
//! | zone+qtype defaults | `/dns/example.net/A-defaults` |
//! | zone+subdomain+qtype defaults | `/dns/example.net/www/A-defaults` |
//!
//! SOA records sit under an exact key (`/dns/example.net/@/SOA`); ANY queries
//! scan everything below the subdomain (`/dns/example.net/www/`).

use crate::constants::APEX_LABEL;
use crate::constants::DEFAULTS_SUFFIX;
use crate::constants::KEY_SEPARATOR;
use crate::constants::LABEL_SEPARATOR;
use crate::constants::QTYPE_ANY;
use crate::constants::QTYPE_SOA;
use crate::zones::ZoneId;

/// The parts of one lookup that determine its keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParts {
    pub zone_id: ZoneId,
    /// Queried name, as received.
    pub qname: String,
    /// Zone name, without a trailing root dot.
    pub zone: String,
    /// Label(s) left after removing the zone from `qname`, or `@`.
    pub subdomain: String,
    pub qtype: String,
}

impl QueryParts {
    pub fn new(
        zone_id: ZoneId,
        qname: impl Into<String>,
        zone: impl Into<String>,
        qtype: impl Into<String>,
    ) -> Self {
        let qname = qname.into();
        let zone = zone.into();
        let subdomain = extract_subdomain(&qname, &zone);
        Self {
            zone_id,
            qname,
            zone,
            subdomain,
            qtype: qtype.into(),
        }
    }

    pub fn is_any(&self) -> bool {
        self.qtype == QTYPE_ANY
    }

    pub fn is_soa(&self) -> bool {
        self.qtype == QTYPE_SOA
    }

    /// Copy of these parts with a different query type.
    pub fn with_qtype(&self, qtype: impl Into<String>) -> Self {
        Self {
            qtype: qtype.into(),
            ..self.clone()
        }
    }
}

/// Strip a trailing root dot, if any.
pub fn trim_root(name: &str) -> &str {
    name.strip_suffix(LABEL_SEPARATOR).unwrap_or(name)
}

/// Subdomain label of `qname` within `zone`.
///
/// Removes the zone suffix, then one trailing `.`. An empty remainder is the
/// apex label `@`. Trailing root dots on either name are ignored.
pub fn extract_subdomain(qname: &str, zone: &str) -> String {
    let qname = trim_root(qname);
    let rest = qname.strip_suffix(trim_root(zone)).unwrap_or(qname);
    let rest = rest.strip_suffix(LABEL_SEPARATOR).unwrap_or(rest);
    if rest.is_empty() {
        APEX_LABEL.to_string()
    } else {
        rest.to_string()
    }
}

/// Key derivation under a configured prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn zone_path(&self, parts: &QueryParts) -> String {
        format!("{}{KEY_SEPARATOR}{}", self.prefix, parts.zone)
    }

    fn subdomain_path(&self, parts: &QueryParts) -> String {
        format!("{}{KEY_SEPARATOR}{}", self.zone_path(parts), parts.subdomain)
    }

    /// Key (SOA) or key prefix (everything else) holding the records.
    pub fn record_key(&self, parts: &QueryParts) -> String {
        let mut key = self.subdomain_path(parts);
        if !parts.is_any() {
            key.push(KEY_SEPARATOR);
            key.push_str(&parts.qtype);
        }
        if !parts.is_soa() {
            key.push(KEY_SEPARATOR);
        }
        key
    }

    pub fn zone_defaults_key(&self, parts: &QueryParts) -> String {
        format!("{}{KEY_SEPARATOR}{DEFAULTS_SUFFIX}", self.zone_path(parts))
    }

    pub fn zone_subdomain_defaults_key(&self, parts: &QueryParts) -> String {
        format!("{}{KEY_SEPARATOR}{DEFAULTS_SUFFIX}", self.subdomain_path(parts))
    }

    pub fn zone_qtype_defaults_key(&self, parts: &QueryParts) -> String {
        format!("{}{KEY_SEPARATOR}{}{DEFAULTS_SUFFIX}", self.zone_path(parts), parts.qtype)
    }

    pub fn zone_subdomain_qtype_defaults_key(&self, parts: &QueryParts) -> String {
        format!("{}{KEY_SEPARATOR}{}{DEFAULTS_SUFFIX}", self.subdomain_path(parts), parts.qtype)
    }
}

/// Whether a key holds a defaults object rather than a record.
pub fn is_defaults_key(key: &str) -> bool {
    key.ends_with(DEFAULTS_SUFFIX)
}

/// Concrete query type of an entry returned by an ANY scan.
///
/// This is the path segment directly after the scanned record-key prefix:
/// `/dns/example.net/www/AAAA/1` under `/dns/example.net/www/` is `AAAA`.
pub fn qtype_from_key<'a>(record_key: &str, key: &'a str) -> &'a str {
    let rest = key.strip_prefix(record_key).unwrap_or(key);
    match rest.find(KEY_SEPARATOR) {
        Some(idx) => &rest[..idx],
        None => rest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(qname: &str, zone: &str, qtype: &str) -> QueryParts {
        QueryParts::new(ZoneId(1), qname, zone, qtype)
    }

    #[test]
    fn test_extract_subdomain() {
        assert_eq!(extract_subdomain("www.example.net", "example.net"), "www");
        assert_eq!(extract_subdomain("www.example.net.", "example.net"), "www");
        assert_eq!(extract_subdomain("a.b.example.net", "example.net"), "a.b");
        assert_eq!(extract_subdomain("example.net", "example.net"), "@");
        assert_eq!(extract_subdomain("example.net.", "example.net"), "@");
        assert_eq!(extract_subdomain("example.net.", "example.net."), "@");
    }

    #[test]
    fn test_record_key_shapes() {
        let keys = KeySpace::new("/dns");
        assert_eq!(keys.record_key(&parts("www.example.net", "example.net", "A")), "/dns/example.net/www/A/");
        assert_eq!(keys.record_key(&parts("example.net", "example.net", "SOA")), "/dns/example.net/@/SOA");
        assert_eq!(keys.record_key(&parts("www.example.net", "example.net", "ANY")), "/dns/example.net/www/");
    }

    #[test]
    fn test_empty_prefix_keeps_leading_separator() {
        let keys = KeySpace::default();
        assert_eq!(keys.record_key(&parts("example.net", "example.net", "NS")), "/example.net/@/NS/");
    }

    #[test]
    fn test_defaults_keys() {
        let keys = KeySpace::new("/dns");
        let p = parts("www.example.net", "example.net", "A");
        assert_eq!(keys.zone_defaults_key(&p), "/dns/example.net/-defaults");
        assert_eq!(keys.zone_subdomain_defaults_key(&p), "/dns/example.net/www/-defaults");
        assert_eq!(keys.zone_qtype_defaults_key(&p), "/dns/example.net/A-defaults");
        assert_eq!(keys.zone_subdomain_qtype_defaults_key(&p), "/dns/example.net/www/A-defaults");

        let soa = parts("example.net", "example.net", "SOA");
        assert_eq!(keys.zone_subdomain_qtype_defaults_key(&soa), "/dns/example.net/@/SOA-defaults");
    }

    #[test]
    fn test_is_defaults_key() {
        assert!(is_defaults_key("/dns/example.net/-defaults"));
        assert!(is_defaults_key("/dns/example.net/www/A-defaults"));
        assert!(!is_defaults_key("/dns/example.net/www/A/1"));
    }

    #[test]
    fn test_qtype_from_key() {
        let prefix = "/dns/example.net/www/";
        assert_eq!(qtype_from_key(prefix, "/dns/example.net/www/AAAA/1"), "AAAA");
        assert_eq!(qtype_from_key(prefix, "/dns/example.net/www/SOA"), "SOA");
    }

    #[test]
    fn test_with_qtype_keeps_other_parts() {
        let p = parts("www.example.net", "example.net", "ANY");
        let a = p.with_qtype("A");
        assert_eq!(a.qtype, "A");
        assert_eq!(a.subdomain, "www");
        assert_eq!(a.zone_id, p.zone_id);
        assert!(p.is_any());
        assert!(!a.is_any());
    }
}
