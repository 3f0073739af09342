use std::fmt;
use std::time::Duration;

use thiserror::Error;

// ---------------------------------------------------------------------------
// FeedError
// ---------------------------------------------------------------------------

/// Classification of change-feed failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedErrorKind {
    /// Backend unreachable or the stream dropped.
    Unavailable,
    /// Caller is not allowed to read the source.
    PermissionDenied,
    /// Source does not exist.
    NotFound,
    /// Feed was closed by the backend.
    Cancelled,
    /// Anything else reported by the client.
    Internal,
}

impl fmt::Display for FeedErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unavailable => "unavailable",
            Self::PermissionDenied => "permission denied",
            Self::NotFound => "not found",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Error reported by a change feed through its `on_error` listener.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Change feed error ({kind}): {message}")]
pub struct FeedError {
    pub kind: FeedErrorKind,
    pub message: String,
}

impl FeedError {
    /// An [`FeedErrorKind::Internal`] error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: FeedErrorKind::Internal,
            message: message.into(),
        }
    }

    /// An error of the given kind.
    pub fn with_kind(message: impl Into<String>, kind: FeedErrorKind) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ReplicaError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum ReplicaError {
    #[error("Malformed snapshot: {reason}")]
    MalformedSnapshot { reason: String },

    #[error("Index {index} out of range for replica of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A batch was rejected because of the event at `position`.
    #[error("Change event #{position} rejected: {source}")]
    InvalidEvent {
        position: usize,
        #[source]
        source: Box<ReplicaError>,
    },
}

impl ReplicaError {
    /// A [`ReplicaError::MalformedSnapshot`] with `reason`.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedSnapshot {
            reason: reason.into(),
        }
    }

    /// The underlying error, looking through `InvalidEvent` wrappers.
    pub fn root(&self) -> &ReplicaError {
        match self {
            Self::InvalidEvent { source, .. } => source.root(),
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// BindError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum BindError {
    #[error("Key \"{0}\" is already bound. Call unbind() first.")]
    DuplicateBinding(String),

    #[error("Document bound to \"{0}\" does not exist")]
    DocumentNotFound(String),

    #[error("Permission denied for \"{key}\": {message}")]
    PermissionDenied { key: String, message: String },

    #[error("Feed for \"{key}\" failed: {source}")]
    Feed {
        key: String,
        #[source]
        source: FeedError,
    },

    #[error("Replica for \"{key}\" rejected a batch: {source}")]
    Replica {
        key: String,
        #[source]
        source: ReplicaError,
    },

    #[error("No initial notification for \"{key}\" within {after:?}")]
    InitialTimeout { key: String, after: Duration },

    /// Unbound before the first notification, or the feed itself was
    /// cancelled by the backend.
    #[error("Binding \"{0}\" was cancelled")]
    Cancelled(String),
}

impl BindError {
    /// The binding key this error belongs to.
    pub fn key(&self) -> &str {
        match self {
            Self::DuplicateBinding(key)
            | Self::DocumentNotFound(key)
            | Self::Cancelled(key) => key,
            Self::PermissionDenied { key, .. }
            | Self::Feed { key, .. }
            | Self::Replica { key, .. }
            | Self::InitialTimeout { key, .. } => key,
        }
    }

    /// Map a feed failure for `key`, lifting permission, not-found and
    /// cancellation failures to their own variants.
    pub(crate) fn from_feed(key: &str, error: FeedError) -> Self {
        match error.kind {
            FeedErrorKind::NotFound => Self::DocumentNotFound(key.to_string()),
            FeedErrorKind::Cancelled => Self::Cancelled(key.to_string()),
            FeedErrorKind::PermissionDenied => Self::PermissionDenied {
                key: key.to_string(),
                message: error.message,
            },
            _ => Self::Feed {
                key: key.to_string(),
                source: error,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// LiveReplicaError: top-level rollup
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LiveReplicaError {
    #[error(transparent)]
    Replica(#[from] ReplicaError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// Convenience alias: the default error type is `LiveReplicaError`.
pub type Result<T, E = LiveReplicaError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
