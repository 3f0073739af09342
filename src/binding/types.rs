//! Binding-specific types: options, bound values and shared replica handles.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::{
    replica::{KeyedReplica, OrderedReplica},
    types::{CanonicalRecord, DEFAULT_ID_FIELD},
};

// ============================================================================
// BinderOptions
// ============================================================================

/// Configuration for a [`SubscriptionManager`](super::SubscriptionManager).
#[derive(Debug, Clone)]
pub struct BinderOptions {
    /// Field under which document ids are merged into records (default: `"id"`).
    pub id_field: String,
    /// How long `bind_one` waits for the first notification
    /// (`None` = wait indefinitely).
    pub initial_timeout: Option<Duration>,
}

impl Default for BinderOptions {
    fn default() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            initial_timeout: None,
        }
    }
}

impl BinderOptions {
    /// Use `id_field` for merged document ids.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Bound how long `bind_one` waits for the first notification.
    pub fn with_initial_timeout(mut self, timeout: Duration) -> Self {
        self.initial_timeout = Some(timeout);
        self
    }
}

// ============================================================================
// Phase
// ============================================================================

/// Lifecycle of one binding. `Unbound` bindings have no table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingPhase {
    /// Feed opened, first notification not yet received.
    Subscribing,
    /// First notification applied.
    Active,
}

// ============================================================================
// Handles
// ============================================================================

/// Shared handle to a collection binding's [`OrderedReplica`].
///
/// The handle registered with the host stays the same for the binding's
/// whole life; batches mutate the replica behind it.
#[derive(Clone, Default)]
pub struct ReplicaHandle(Arc<RwLock<OrderedReplica>>);

impl ReplicaHandle {
    /// Handle to a fresh, empty replica.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently mirrored.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// True when the replica holds no records.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Copy of the current records, in order.
    pub fn snapshot(&self) -> Vec<CanonicalRecord> {
        self.0.read().snapshot()
    }

    /// Document ids in replica order.
    pub fn ids(&self) -> Vec<String> {
        self.0.read().ids().into_iter().map(str::to_string).collect()
    }

    /// Run `f` with read access to the replica.
    pub fn read<R>(&self, f: impl FnOnce(&OrderedReplica) -> R) -> R {
        f(&self.0.read())
    }

    /// True when both handles point to the same replica.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut OrderedReplica) -> R) -> R {
        f(&mut self.0.write())
    }
}

impl fmt::Debug for ReplicaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReplicaHandle").field(&self.ids()).finish()
    }
}

/// Shared handle to a keyed collection binding's [`KeyedReplica`].
#[derive(Clone, Default)]
pub struct KeyedHandle(Arc<RwLock<KeyedReplica>>);

impl KeyedHandle {
    /// Handle to a fresh, empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently mirrored.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// True when the map holds no documents.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Run `f` with read access to the map.
    pub fn read<R>(&self, f: impl FnOnce(&KeyedReplica) -> R) -> R {
        f(&self.0.read())
    }

    /// True when both handles point to the same map.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut KeyedReplica) -> R) -> R {
        f(&mut self.0.write())
    }
}

impl fmt::Debug for KeyedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyedHandle").field(&self.0.read().len()).finish()
    }
}

// ============================================================================
// BoundValue
// ============================================================================

/// The value a host sees under a bound key.
#[derive(Debug, Clone)]
pub enum BoundValue {
    /// Document binding still waiting for its first snapshot.
    Pending,
    Collection(ReplicaHandle),
    Keyed(KeyedHandle),
    /// Latest document snapshot; replaced on every notification.
    Document(CanonicalRecord),
}

impl BoundValue {
    /// The ordered replica handle, for collection bindings.
    pub fn as_collection(&self) -> Option<&ReplicaHandle> {
        match self {
            Self::Collection(handle) => Some(handle),
            _ => None,
        }
    }

    /// The map handle, for keyed bindings.
    pub fn as_keyed(&self) -> Option<&KeyedHandle> {
        match self {
            Self::Keyed(handle) => Some(handle),
            _ => None,
        }
    }

    /// The latest snapshot, for resolved document bindings.
    pub fn as_document(&self) -> Option<&CanonicalRecord> {
        match self {
            Self::Document(record) => Some(record),
            _ => None,
        }
    }

    /// True for a document binding that has not resolved yet.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}
