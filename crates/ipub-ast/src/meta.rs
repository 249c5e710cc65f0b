//! Document metadata

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::{Block, Inline};
use crate::stringify::stringify;

/// A metadata value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum MetaValue {
    MetaMap(BTreeMap<String, MetaValue>),
    MetaList(Vec<MetaValue>),
    MetaBool(bool),
    MetaString(String),
    MetaInlines(Vec<Inline>),
    MetaBlocks(Vec<Block>),
}

impl MetaValue {
    /// Interpret as a boolean; strings `"true"`/`"false"` are accepted too
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValue::MetaBool(b) => Some(*b),
            MetaValue::MetaString(_) | MetaValue::MetaInlines(_) => {
                match self.as_string()?.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" => Some(true),
                    "false" | "no" => Some(false),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Interpret as plain text
    pub fn as_string(&self) -> Option<String> {
        match self {
            MetaValue::MetaString(s) => Some(s.clone()),
            MetaValue::MetaInlines(inlines) => Some(stringify(inlines)),
            MetaValue::MetaBool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, MetaValue>> {
        match self {
            MetaValue::MetaMap(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[MetaValue]> {
        match self {
            MetaValue::MetaList(l) => Some(l),
            _ => None,
        }
    }
}

/// Top-level document metadata
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meta(pub BTreeMap<String, MetaValue>);

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: MetaValue) {
        self.0.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<MetaValue> {
        self.0.remove(key)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Look up a dotted path (`ipub.pandoc.use_numref`) through nested maps
    pub fn get_path(&self, path: &str) -> Option<&MetaValue> {
        let mut parts = path.split('.');
        let mut value = self.0.get(parts.next()?)?;
        for part in parts {
            value = value.as_map()?.get(part)?;
        }
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> Meta {
        let mut pandoc = BTreeMap::new();
        pandoc.insert("use_numref".to_string(), MetaValue::MetaBool(true));
        pandoc.insert(
            "reftag".to_string(),
            MetaValue::MetaInlines(vec![Inline::str("other")]),
        );
        let mut ipub = BTreeMap::new();
        ipub.insert("pandoc".to_string(), MetaValue::MetaMap(pandoc));
        let mut meta = Meta::new();
        meta.insert("ipub", MetaValue::MetaMap(ipub));
        meta
    }

    #[test]
    fn test_get_path() {
        let meta = nested();
        assert_eq!(
            meta.get_path("ipub.pandoc.use_numref")
                .and_then(MetaValue::as_bool),
            Some(true)
        );
        assert_eq!(
            meta.get_path("ipub.pandoc.reftag")
                .and_then(MetaValue::as_string),
            Some("other".to_string())
        );
        assert!(meta.get_path("ipub.latex.x").is_none());
        assert!(meta.get_path("ipub.pandoc.use_numref.deeper").is_none());
    }

    #[test]
    fn test_string_bools() {
        assert_eq!(
            MetaValue::MetaString("False".into()).as_bool(),
            Some(false)
        );
        assert_eq!(MetaValue::MetaString("maybe".into()).as_bool(), None);
    }
}
