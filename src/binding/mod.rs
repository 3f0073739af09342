//! Binding layer: keys of a host object bound to live sources.
//!
//! [`SubscriptionManager`] owns the subscription table of one host object:
//! `bind` opens a feed and returns an [`InitialValue`] future, later
//! notifications mutate the bound replica in place and are reported through
//! `on_event`, and `unbind` / `teardown_all` detach feeds.

pub mod declare;
pub mod manager;
pub mod types;

pub use declare::{DeclarationFactory, Declarations};
pub use manager::{InitialValue, SubscriptionManager};
pub use types::{BinderOptions, BindingPhase, BoundValue, KeyedHandle, ReplicaHandle};
