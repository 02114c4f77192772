//! The resolution engine.
//!
//! A [`Resolver`] owns the zone registry and the defaults cache and answers
//! one lookup at a time. Each lookup performs exactly one record read against
//! the store (an exact read for SOA, a prefix scan otherwise) and then loads
//! whatever defaults objects the returned entries need.

use std::time::Duration;

use kvdns_core::KeyValue;
use kvdns_core::KeyValueStore;
use kvdns_core::ReadRequest;
use kvdns_core::ScanRequest;
use kvdns_core::ScanResult;
use serde::Deserialize;
use serde::Serialize;
use snafu::ResultExt;
use tracing::debug;
use tracing::trace;

use crate::constants::DEFAULT_TIMEOUT;
use crate::deadline::Deadline;
use crate::defaults::DefaultsCache;
use crate::error::DecodeSnafu;
use crate::error::ResolveError;
use crate::error::ResolveResult;
use crate::keys::KeySpace;
use crate::keys::QueryParts;
use crate::keys::is_defaults_key;
use crate::keys::qtype_from_key;
use crate::keys::trim_root;
use crate::records::RecordType;
use crate::records::encode;
use crate::value::FieldMap;
use crate::value::ValuesChain;
use crate::zones::ZoneId;
use crate::zones::ZoneRegistry;

/// Settings for a [`Resolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Key prefix all zones live under. May be empty.
    pub prefix: String,
    /// Bound on all store calls of a single lookup.
    pub timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A lookup request from the name server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    pub qname: String,
    pub zone_id: ZoneId,
    pub qtype: String,
}

impl LookupQuery {
    pub fn new(qname: impl Into<String>, zone_id: ZoneId, qtype: impl Into<String>) -> Self {
        Self {
            qname: qname.into(),
            zone_id,
            qtype: qtype.into(),
        }
    }
}

/// One answer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    pub domain_id: ZoneId,
    pub qname: String,
    pub qtype: String,
    pub content: String,
    /// Time-to-live in whole seconds.
    pub ttl: i64,
    pub auth: bool,
}

/// Resolution engine over a key-value store.
pub struct Resolver<S> {
    store: S,
    keys: KeySpace,
    timeout: Duration,
    zones: ZoneRegistry,
    defaults: DefaultsCache,
}

impl<S: KeyValueStore> Resolver<S> {
    pub fn new(store: S, config: ResolverConfig) -> Self {
        Self {
            store,
            keys: KeySpace::new(config.prefix),
            timeout: config.timeout,
            zones: ZoneRegistry::new(),
            defaults: DefaultsCache::new(),
        }
    }

    pub fn zones(&self) -> &ZoneRegistry {
        &self.zones
    }

    pub fn defaults(&self) -> &DefaultsCache {
        &self.defaults
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Answer one lookup.
    ///
    /// An empty list is a valid answer. Any failing entry fails the whole
    /// lookup; nothing is retried.
    pub async fn lookup(&mut self, query: &LookupQuery) -> ResolveResult<Vec<ResultItem>> {
        let (zone, pending_zone) = match self.zones.resolve(query.zone_id) {
            Some(zone) => (zone.to_string(), false),
            None => (trim_root(&query.qname).to_string(), true),
        };
        let mut parts = QueryParts::new(query.zone_id, query.qname.as_str(), zone, query.qtype.as_str());
        let record_key = self.keys.record_key(&parts);
        debug!(
            qname = %parts.qname,
            qtype = %parts.qtype,
            zone_id = %parts.zone_id,
            key = %record_key,
            "lookup"
        );

        let deadline = Deadline::after(self.timeout);
        let response: ScanResult = if parts.is_soa() {
            deadline.run(self.store.read(ReadRequest::new(record_key.as_str()))).await?.into()
        } else {
            deadline.run(self.store.scan(ScanRequest::new(record_key.as_str()))).await?
        };
        let revision = response.revision;
        self.defaults.observe_revision(revision);

        if !response.entries.is_empty() {
            let zone_key = self.keys.zone_defaults_key(&parts);
            let sub_key = self.keys.zone_subdomain_defaults_key(&parts);
            self.load_defaults(&zone_key, deadline).await?;
            self.load_defaults(&sub_key, deadline).await?;
            if pending_zone && parts.is_soa() {
                parts.zone_id = self.zones.register(&parts.zone);
            }
        }

        let mut items = Vec::with_capacity(response.entries.len());
        for entry in &response.entries {
            if is_defaults_key(&entry.key) {
                trace!(key = %entry.key, "skipping defaults entry");
                continue;
            }
            if entry.value.is_empty() {
                return Err(ResolveError::EmptyValue { key: entry.key.clone() });
            }
            let entry_parts = if parts.is_any() {
                parts.with_qtype(qtype_from_key(&record_key, &entry.key))
            } else {
                parts.clone()
            };
            items.push(self.resolve_entry(&entry_parts, entry, revision, deadline).await?);
        }
        Ok(items)
    }

    /// Turn one stored record into an answer.
    async fn resolve_entry(
        &mut self,
        parts: &QueryParts,
        entry: &KeyValue,
        revision: u64,
        deadline: Deadline,
    ) -> ResolveResult<ResultItem> {
        let sub_qtype_key = self.keys.zone_subdomain_qtype_defaults_key(parts);
        let sub_key = self.keys.zone_subdomain_defaults_key(parts);
        let qtype_key = self.keys.zone_qtype_defaults_key(parts);
        let zone_key = self.keys.zone_defaults_key(parts);
        self.load_defaults(&qtype_key, deadline).await?;
        self.load_defaults(&sub_qtype_key, deadline).await?;

        let empty = FieldMap::new();
        let defaults_chain = [&sub_qtype_key, &sub_key, &qtype_key, &zone_key]
            .map(|key| self.defaults.get(key.as_str()).unwrap_or(&empty));

        let (content, ttl) = if entry.value.first() == Some(&b'{') {
            let value: FieldMap = serde_json::from_slice(&entry.value).context(DecodeSnafu {
                key: entry.key.as_str(),
            })?;
            let mut maps = Vec::with_capacity(defaults_chain.len() + 1);
            maps.push(&value);
            maps.extend(defaults_chain);
            let chain = ValuesChain::new(maps);
            let record_type = RecordType::from_qtype(&parts.qtype).ok_or_else(|| ResolveError::UnsupportedType {
                qtype: parts.qtype.clone(),
                key: entry.key.clone(),
            })?;
            let record = encode(record_type, &chain, &parts.qname, revision)?;
            (record.content, record.ttl)
        } else {
            let content = String::from_utf8(entry.value.clone()).map_err(|_| ResolveError::NotUtf8 {
                key: entry.key.clone(),
            })?;
            let ttl = ValuesChain::new(defaults_chain.to_vec()).duration("ttl")?;
            (content, ttl)
        };

        Ok(ResultItem {
            domain_id: parts.zone_id,
            qname: parts.qname.clone(),
            qtype: parts.qtype.clone(),
            content,
            ttl: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
            auth: true,
        })
    }

    async fn load_defaults(&mut self, key: &str, deadline: Deadline) -> ResolveResult<()> {
        self.defaults.ensure_loaded(&self.store, key, deadline).await
    }
}

#[cfg(test)]
mod tests {
    use kvdns_core::InMemoryKeyValueStore;

    use super::*;
    use crate::error::ErrorKind;

    fn resolver(store: InMemoryKeyValueStore) -> Resolver<InMemoryKeyValueStore> {
        Resolver::new(store, ResolverConfig::default())
    }

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert_eq!(config.prefix, "");
        assert_eq!(config.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_result_item_wire_shape() {
        let item = ResultItem {
            domain_id: ZoneId(1),
            qname: "example.net".to_string(),
            qtype: "A".to_string(),
            content: "192.0.2.1".to_string(),
            ttl: 300,
            auth: true,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "domain_id": 1,
                "qname": "example.net",
                "qtype": "A",
                "content": "192.0.2.1",
                "ttl": 300,
                "auth": true,
            })
        );
    }

    #[tokio::test]
    async fn test_verbatim_value_uses_defaults_ttl() {
        let store = InMemoryKeyValueStore::new();
        store.put("/example.net/-defaults", r#"{"ttl": 600}"#);
        store.put("/example.net/@/TXT/1", "\"v=spf1 -all\"");
        let mut resolver = resolver(store);

        let items = resolver.lookup(&LookupQuery::new("example.net", ZoneId(0), "TXT")).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "\"v=spf1 -all\"");
        assert_eq!(items[0].ttl, 600);
    }

    #[tokio::test]
    async fn test_empty_value_fails() {
        let store = InMemoryKeyValueStore::new();
        store.put("/example.net/-defaults", r#"{"ttl": 600}"#);
        store.put("/example.net/@/A/1", "");
        let mut resolver = resolver(store);

        let err = resolver.lookup(&LookupQuery::new("example.net", ZoneId(0), "A")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert_eq!(err.to_string(), "empty value (/example.net/@/A/1)");
    }

    #[tokio::test]
    async fn test_no_entries_loads_no_defaults() {
        let store = InMemoryKeyValueStore::new();
        let mut resolver = resolver(store);

        let items = resolver.lookup(&LookupQuery::new("example.net", ZoneId(0), "SOA")).await.unwrap();
        assert!(items.is_empty());
        assert!(resolver.zones().is_empty());
        assert_eq!(resolver.store().read_count(), 1);
    }

    #[tokio::test]
    async fn test_defaults_entries_are_skipped_in_any() {
        let store = InMemoryKeyValueStore::new();
        store.put("/example.net/@/-defaults", r#"{"ttl": 60}"#);
        store.put("/example.net/@/A/1", r#"{"ip": "192.0.2.1"}"#);
        let mut resolver = resolver(store);

        let items = resolver.lookup(&LookupQuery::new("example.net", ZoneId(0), "ANY")).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].qtype, "A");
        assert_eq!(items[0].ttl, 60);
    }
}
