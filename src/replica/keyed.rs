//! KeyedReplica: a collection mirrored as an id → fields map.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::types::Fields;

/// Collection bound as an object: each live document's data keyed by its id.
///
/// Ordering follows the id, not the feed; indices in change events are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyedReplica {
    entries: BTreeMap<String, Fields>,
}

impl KeyedReplica {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the data for `id`, returning the previous data.
    pub fn set(&mut self, id: impl Into<String>, fields: Fields) -> Option<Fields> {
        self.entries.insert(id.into(), fields)
    }

    /// Remove `id`. Absent ids are ignored.
    pub fn delete(&mut self, id: &str) -> Option<Fields> {
        self.entries.remove(id)
    }

    /// Data stored for `id`.
    pub fn get(&self, id: &str) -> Option<&Fields> {
        self.entries.get(id)
    }

    /// True when `id` is present.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the map holds no documents.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the current map.
    pub fn snapshot(&self) -> BTreeMap<String, Fields> {
        self.entries.clone()
    }

    /// The whole map as one JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(id, fields)| (id.clone(), Value::Object(fields.clone())))
                .collect(),
        )
    }
}
