//! BindingEvent: the long-lived notification stream of a manager.
//!
//! The initial bind future settles once; everything that happens afterwards
//! (later batches, late errors, unbinds) is reported here.

use crate::{error::BindError, replica::BatchSummary};

#[derive(Debug, Clone)]
pub enum BindingEvent {
    /// The first notification for `key` was materialized.
    Resolved { key: String },
    /// A later notification changed the value bound to `key`.
    /// `summary` is `None` for document bindings.
    Updated {
        key: String,
        summary: Option<BatchSummary>,
    },
    /// A notification for `key` failed. `initial` is true when the error
    /// also rejected the bind future.
    Error {
        key: String,
        error: BindError,
        initial: bool,
    },
    /// `key` was unbound and its feed detached.
    Unbound { key: String },
}

impl BindingEvent {
    /// The key this event concerns.
    pub fn key(&self) -> &str {
        match self {
            Self::Resolved { key }
            | Self::Updated { key, .. }
            | Self::Error { key, .. }
            | Self::Unbound { key } => key,
        }
    }

    /// True for [`BindingEvent::Error`].
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
