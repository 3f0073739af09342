//! Declarative bindings: a host declares `{key: descriptor}` pairs that are
//! bound when it is created and unbound when it is torn down.

use std::fmt;

use crate::{error::BindError, feed::SourceDescriptor};

use super::manager::{InitialValue, SubscriptionManager};

/// Boxed factory producing declared bindings when the host mounts.
pub type DeclarationFactory = Box<dyn FnOnce() -> Vec<(String, SourceDescriptor)> + Send>;

/// Bindings declared by a host object.
pub enum Declarations {
    Map(Vec<(String, SourceDescriptor)>),
    /// Evaluated once, at mount time.
    Factory(DeclarationFactory),
}

impl Declarations {
    /// Declarations from `(key, descriptor)` pairs, bound in order.
    pub fn map<K: Into<String>>(pairs: impl IntoIterator<Item = (K, SourceDescriptor)>) -> Self {
        Self::Map(pairs.into_iter().map(|(k, d)| (k.into(), d)).collect())
    }

    /// Declarations computed by `f` when the host mounts.
    pub fn factory(f: impl FnOnce() -> Vec<(String, SourceDescriptor)> + Send + 'static) -> Self {
        Self::Factory(Box::new(f))
    }

    fn resolve(self) -> Vec<(String, SourceDescriptor)> {
        match self {
            Self::Map(pairs) => pairs,
            Self::Factory(f) => f(),
        }
    }
}

impl fmt::Debug for Declarations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map(pairs) => f
                .debug_tuple("Declarations::Map")
                .field(&pairs.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>())
                .finish(),
            Self::Factory(_) => f.write_str("Declarations::Factory(..)"),
        }
    }
}

impl SubscriptionManager {
    /// Bind every declared pair, in declaration order.
    ///
    /// A failing key (e.g. declared twice) does not stop the others; its
    /// error is returned in place of its [`InitialValue`].
    pub fn mount(
        &self,
        declarations: Declarations,
    ) -> Vec<(String, Result<InitialValue, BindError>)> {
        let pairs = declarations.resolve();
        tracing::debug!(count = pairs.len(), "mounting declared bindings");
        pairs
            .into_iter()
            .map(|(key, descriptor)| {
                let result = self.bind(key.clone(), descriptor);
                if let Err(error) = &result {
                    tracing::warn!(key = %key, error = %error, "declared binding rejected");
                }
                (key, result)
            })
            .collect()
    }
}
