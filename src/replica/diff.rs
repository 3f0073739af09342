//! Diff applicator: applies change batches to local replicas.
//!
//! Each event's indices are relative to the replica *after* every earlier
//! event of the same batch, so events are applied strictly in delivery
//! order. A batch is planned first (records normalized, indices checked
//! against a running length) and only then applied; a rejected batch leaves
//! the replica untouched.

use crate::{
    error::{ReplicaError, Result},
    types::{CanonicalRecord, ChangeBatch, ChangeEvent, Fields},
};

use super::{
    keyed::KeyedReplica,
    normalize::{document_id, normalize, normalize_fields},
    ordered::OrderedReplica,
};

// ============================================================================
// Summary
// ============================================================================

/// Counts of what a batch did to a replica.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub inserted: usize,
    pub removed: usize,
    /// In-place modifications (old index == new index).
    pub replaced: usize,
    /// Modifications that changed position.
    pub moved: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.removed + self.replaced + self.moved
    }

    /// True when the batch changed positions, not only contents.
    pub fn reordered(&self) -> bool {
        self.inserted + self.removed + self.moved > 0
    }
}

// ============================================================================
// Ordered replica
// ============================================================================

enum Op {
    Insert(usize, CanonicalRecord),
    Remove(usize),
    Replace(usize, CanonicalRecord),
    Move {
        from: usize,
        to: usize,
        record: CanonicalRecord,
    },
}

/// Apply `batch` to `replica` in delivery order.
///
/// - `Added` inserts at `new_index`.
/// - `Removed` removes at `old_index`.
/// - `Modified` replaces in place when the indices match, otherwise removes
///   at `old_index` and then inserts at `new_index`. The inserted record is
///   the freshly normalized one.
pub fn apply(
    replica: &mut OrderedReplica,
    batch: &ChangeBatch,
    id_field: &str,
) -> Result<BatchSummary, ReplicaError> {
    let ops = plan(replica.len(), batch, id_field)?;
    let mut summary = BatchSummary::default();

    for op in ops {
        match op {
            Op::Insert(index, record) => {
                replica.insert_at(index, record)?;
                summary.inserted += 1;
            }
            Op::Remove(index) => {
                replica.remove_at(index)?;
                summary.removed += 1;
            }
            Op::Replace(index, record) => {
                replica.replace_at(index, record)?;
                summary.replaced += 1;
            }
            Op::Move { from, to, record } => {
                // Remove first: `to` is relative to the replica without `from`.
                replica.remove_at(from)?;
                replica.insert_at(to, record)?;
                summary.moved += 1;
            }
        }
    }

    Ok(summary)
}

fn plan(start_len: usize, batch: &ChangeBatch, id_field: &str) -> Result<Vec<Op>, ReplicaError> {
    let mut len = start_len;
    let mut ops = Vec::with_capacity(batch.len());

    for (position, event) in batch.iter().enumerate() {
        let op = plan_event(&mut len, event, id_field).map_err(|source| {
            ReplicaError::InvalidEvent {
                position,
                source: Box::new(source),
            }
        })?;
        ops.push(op);
    }

    Ok(ops)
}

fn plan_event(len: &mut usize, event: &ChangeEvent, id_field: &str) -> Result<Op, ReplicaError> {
    match event {
        ChangeEvent::Added { doc, new_index } => {
            let record = normalize(doc, id_field)?;
            check(*new_index, *len + 1, *len)?;
            *len += 1;
            Ok(Op::Insert(*new_index, record))
        }
        ChangeEvent::Removed { old_index, .. } => {
            check(*old_index, *len, *len)?;
            *len -= 1;
            Ok(Op::Remove(*old_index))
        }
        ChangeEvent::Modified {
            doc,
            old_index,
            new_index,
        } => {
            let record = normalize(doc, id_field)?;
            check(*old_index, *len, *len)?;
            if old_index == new_index {
                Ok(Op::Replace(*new_index, record))
            } else {
                // After the removal the replica is one shorter; the insert
                // may then target any index up to that shorter length.
                check(*new_index, *len, *len - 1)?;
                Ok(Op::Move {
                    from: *old_index,
                    to: *new_index,
                    record,
                })
            }
        }
    }
}

/// `index` must be below `bound`; `len` is reported on failure.
fn check(index: usize, bound: usize, len: usize) -> Result<(), ReplicaError> {
    if index < bound {
        Ok(())
    } else {
        Err(ReplicaError::IndexOutOfRange { index, len })
    }
}

// ============================================================================
// Keyed replica
// ============================================================================

enum KeyedOp {
    Set(String, Fields, bool),
    Delete(String),
}

/// Apply `batch` to a keyed replica: `Added`/`Modified` set the document's
/// data under its id, `Removed` deletes it. Indices are ignored.
pub fn apply_keyed(
    replica: &mut KeyedReplica,
    batch: &ChangeBatch,
) -> Result<BatchSummary, ReplicaError> {
    let mut ops = Vec::with_capacity(batch.len());
    for (position, event) in batch.iter().enumerate() {
        let op = plan_keyed(event).map_err(|source| ReplicaError::InvalidEvent {
            position,
            source: Box::new(source),
        })?;
        ops.push(op);
    }

    let mut summary = BatchSummary::default();
    for op in ops {
        match op {
            KeyedOp::Set(id, fields, added) => {
                replica.set(id, fields);
                if added {
                    summary.inserted += 1;
                } else {
                    summary.replaced += 1;
                }
            }
            KeyedOp::Delete(id) => {
                replica.delete(&id);
                summary.removed += 1;
            }
        }
    }
    Ok(summary)
}

fn plan_keyed(event: &ChangeEvent) -> Result<KeyedOp, ReplicaError> {
    let doc = event.doc();
    let id = document_id(doc)?.to_string();
    match event {
        ChangeEvent::Added { .. } => Ok(KeyedOp::Set(id, normalize_fields(doc)?, true)),
        ChangeEvent::Modified { .. } => Ok(KeyedOp::Set(id, normalize_fields(doc)?, false)),
        ChangeEvent::Removed { .. } => Ok(KeyedOp::Delete(id)),
    }
}
