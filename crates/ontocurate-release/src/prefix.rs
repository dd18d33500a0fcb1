//! Compact identifier <-> IRI mapping.
//!
//! Identifiers look like `ADDICTO:0000123`. Explicit prefix declarations win;
//! otherwise the OBO convention `http://purl.obolibrary.org/obo/ADDICTO_0000123`
//! is used.

use serde::{Deserialize, Serialize};

pub const OBO_BASE: &str = "http://purl.obolibrary.org/obo/";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixMap {
    entries: Vec<(String, String)>,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `prefix` as an abbreviation for `expansion`.
    /// Re-registering a prefix replaces its expansion.
    pub fn insert(&mut self, prefix: impl Into<String>, expansion: impl Into<String>) {
        let prefix = prefix.into();
        let expansion = expansion.into();
        if let Some(entry) = self.entries.iter_mut().find(|(p, _)| *p == prefix) {
            entry.1 = expansion;
        } else {
            self.entries.push((prefix, expansion));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expand a compact identifier into a full IRI.
    pub fn expand(&self, id: &str) -> Option<String> {
        let (prefix, local) = id.split_once(':')?;
        if prefix.is_empty() || local.is_empty() {
            return None;
        }
        if let Some((_, expansion)) = self.entries.iter().find(|(p, _)| p == prefix) {
            return Some(format!("{expansion}{local}"));
        }
        Some(format!("{OBO_BASE}{prefix}_{local}"))
    }

    /// Compress a full IRI into a compact identifier.
    ///
    /// The longest matching declared expansion is preferred.
    pub fn compress(&self, iri: &str) -> Option<String> {
        let declared = self
            .entries
            .iter()
            .filter(|(_, expansion)| iri.starts_with(expansion.as_str()))
            .max_by_key(|(_, expansion)| expansion.len());
        if let Some((prefix, expansion)) = declared {
            let local = &iri[expansion.len()..];
            if !local.is_empty() {
                return Some(format!("{prefix}:{local}"));
            }
        }

        let local = iri.strip_prefix(OBO_BASE)?;
        let (prefix, rest) = local.split_once('_')?;
        if prefix.is_empty() || rest.is_empty() {
            return None;
        }
        Some(format!("{prefix}:{rest}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obo_convention_round_trips() {
        let map = PrefixMap::new();
        let iri = map.expand("ADDICTO:0000123").unwrap();
        assert_eq!(iri, "http://purl.obolibrary.org/obo/ADDICTO_0000123");
        assert_eq!(map.compress(&iri).as_deref(), Some("ADDICTO:0000123"));
    }

    #[test]
    fn declared_prefixes_take_precedence() {
        let mut map = PrefixMap::new();
        map.insert("EX", "http://example.org/onto#");
        map.insert("EXA", "http://example.org/onto#a/");
        assert_eq!(
            map.expand("EX:Thing").as_deref(),
            Some("http://example.org/onto#Thing")
        );
        assert_eq!(
            map.compress("http://example.org/onto#a/b").as_deref(),
            Some("EXA:b")
        );
    }

    #[test]
    fn malformed_identifiers_do_not_resolve() {
        let map = PrefixMap::new();
        assert_eq!(map.expand("no-colon"), None);
        assert_eq!(map.expand(":0001"), None);
        assert_eq!(map.compress("http://elsewhere.org/x"), None);
    }
}
