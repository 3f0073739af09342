//! Local replicas of remote sources and the diff logic that keeps them in sync.
//!
//! # Modules
//!
//! - [`normalize`]: raw feed documents into [`CanonicalRecord`](crate::types::CanonicalRecord)s.
//! - [`ordered`]: [`OrderedReplica`], the mirror of a collection query.
//! - [`keyed`]: [`KeyedReplica`], a collection mirrored as an id → fields map.
//! - [`diff`]: [`apply`] / [`apply_keyed`] for change batches.

pub mod diff;
pub mod keyed;
pub mod normalize;
pub mod ordered;

pub use diff::{apply, apply_keyed, BatchSummary};
pub use keyed::KeyedReplica;
pub use normalize::{normalize, normalize_fields};
pub use ordered::OrderedReplica;
