//! OrderedReplica: the local mirror of a collection query's result set.

use crate::{
    error::{ReplicaError, Result},
    types::CanonicalRecord,
};

/// Ordered, mutable sequence of [`CanonicalRecord`]s, indexed `0..len`.
///
/// Index operations never resize beyond the requested operation: inserts
/// accept `index <= len`, removals and replacements `index < len`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedReplica {
    records: Vec<CanonicalRecord>,
}

impl OrderedReplica {
    /// An empty replica.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` at `index`, shifting later records right.
    ///
    /// Fails with [`ReplicaError::IndexOutOfRange`] when `index > len`.
    pub fn insert_at(&mut self, index: usize, record: CanonicalRecord) -> Result<(), ReplicaError> {
        if index > self.records.len() {
            return Err(self.out_of_range(index));
        }
        self.records.insert(index, record);
        Ok(())
    }

    /// Remove and return the record at `index`; fails when `index >= len`.
    pub fn remove_at(&mut self, index: usize) -> Result<CanonicalRecord, ReplicaError> {
        if index >= self.records.len() {
            return Err(self.out_of_range(index));
        }
        Ok(self.records.remove(index))
    }

    /// Replace the record at `index`, returning the previous one.
    pub fn replace_at(
        &mut self,
        index: usize,
        record: CanonicalRecord,
    ) -> Result<CanonicalRecord, ReplicaError> {
        match self.records.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, record)),
            None => Err(self.out_of_range(index)),
        }
    }

    /// The record at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&CanonicalRecord> {
        self.records.get(index)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the replica holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in order.
    pub fn iter(&self) -> std::slice::Iter<'_, CanonicalRecord> {
        self.records.iter()
    }

    /// Immutable copy of the current contents.
    pub fn snapshot(&self) -> Vec<CanonicalRecord> {
        self.records.clone()
    }

    /// Document ids in replica order.
    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }

    fn out_of_range(&self, index: usize) -> ReplicaError {
        ReplicaError::IndexOutOfRange {
            index,
            len: self.records.len(),
        }
    }
}
