pub mod error;
pub mod types;

pub mod binding;
pub mod feed;
pub mod reactive;
pub mod replica;

pub use binding::{BinderOptions, BoundValue, Declarations, SubscriptionManager};
pub use error::{BindError, FeedError, FeedErrorKind, ReplicaError};
pub use feed::{ChangeFeed, FeedController, SourceDescriptor};
pub use types::{CanonicalRecord, ChangeBatch, ChangeEvent, RawDocument};
