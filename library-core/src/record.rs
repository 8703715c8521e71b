//! Resource records: one row as an ordered key -> JSON value map

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::casing::{to_storage_casing, to_wire_casing};

/// One row of a resource.
///
/// Keys are in storage casing inside the persistence layer and in wire casing
/// once handed back to callers. A record lives for a single request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// True when the key is absent or explicitly null
    pub fn is_missing(&self, key: &str) -> bool {
        matches!(self.0.get(key), None | Some(Value::Null))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }

    /// Re-key every entry into camelCase.
    pub fn into_wire_casing(self) -> Self {
        self.0
            .into_iter()
            .map(|(k, v)| (to_wire_casing(&k), v))
            .collect()
    }

    /// Re-key every entry into snake_case.
    pub fn into_storage_casing(self) -> Self {
        self.0
            .into_iter()
            .map(|(k, v)| (to_storage_casing(&k), v))
            .collect()
    }

    /// `self ∪ update`, with `update` winning on key conflicts.
    pub fn merge(mut self, update: Record) -> Self {
        self.0.extend(update.0);
        self
    }
}

/// Missing keys index to `Value::Null`, like `serde_json::Value`.
impl std::ops::Index<&str> for Record {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.0.get(key).unwrap_or(&NULL)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<serde_json::Map<String, Value>> for Record {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
