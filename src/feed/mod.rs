//! Change-feed boundary: the contract this crate consumes from a database
//! client, plus an in-memory implementation.
//!
//! A feed delivers notifications in emission order through `on_next` and
//! reports failures through `on_error`; at most one of the two fires for a
//! given notification. Collection feeds deliver [`ChangeBatch`]es whose first
//! batch lists the current result set as `Added` events; document feeds
//! deliver full [`RawDocument`] snapshots.

use std::fmt;
use std::sync::Arc;

use crate::{
    error::FeedError,
    types::{ChangeBatch, RawDocument},
};

pub mod controller;

pub use controller::FeedController;

/// Shared callback receiving feed notifications.
pub type Listener<T> = Arc<dyn Fn(T) + Send + Sync>;

/// An owned one-shot closure that detaches a listener when called.
pub type Unsubscribe = Box<dyn FnOnce() + Send + Sync>;

/// A live notification stream.
pub trait ChangeFeed<T>: Send + Sync {
    /// Start delivering notifications. Implementations may call `on_next`
    /// before returning (e.g. from a local cache).
    fn subscribe(&self, on_next: Listener<T>, on_error: Listener<FeedError>) -> Unsubscribe;
}

/// What a key is bound to, chosen by the caller when the descriptor is built.
#[derive(Clone)]
pub enum SourceDescriptor {
    /// Multi-document ordered query, mirrored through incremental diffs.
    Collection(Arc<dyn ChangeFeed<ChangeBatch>>),
    /// Single document, replaced wholesale on each snapshot.
    Document(Arc<dyn ChangeFeed<RawDocument>>),
}

impl SourceDescriptor {
    /// Wrap a collection feed.
    pub fn collection(feed: impl ChangeFeed<ChangeBatch> + 'static) -> Self {
        Self::Collection(Arc::new(feed))
    }

    /// Wrap a document feed.
    pub fn document(feed: impl ChangeFeed<RawDocument> + 'static) -> Self {
        Self::Document(Arc::new(feed))
    }

    /// True for [`SourceDescriptor::Collection`].
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }
}

impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection(_) => f.write_str("SourceDescriptor::Collection(..)"),
            Self::Document(_) => f.write_str("SourceDescriptor::Document(..)"),
        }
    }
}
