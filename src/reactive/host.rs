//! Host boundary: where bound values are published for rendering.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::binding::types::BoundValue;

/// The reactive layer of a host object.
///
/// Injected into a [`SubscriptionManager`](crate::binding::SubscriptionManager);
/// the manager never reaches for a global host.
pub trait ReactiveHost: Send + Sync {
    /// Publish `value` under `key`, defining the key on first use and
    /// reassigning it afterwards. Must be idempotent.
    fn register_or_update(&self, key: &str, value: BoundValue);

    /// Called when the binding for `key` is removed. Hosts may keep the last
    /// value; the default does nothing.
    fn release(&self, _key: &str) {}
}

/// In-memory [`ReactiveHost`]: latest value per key plus a publish counter.
#[derive(Default)]
pub struct MemoryHost {
    state: Mutex<HostState>,
}

#[derive(Default)]
struct HostState {
    values: HashMap<String, BoundValue>,
    publishes: HashMap<String, usize>,
    released: Vec<String>,
}

impl MemoryHost {
    /// A host with no keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest value published under `key`.
    pub fn get(&self, key: &str) -> Option<BoundValue> {
        self.state.lock().values.get(key).cloned()
    }

    /// True once `key` has been published.
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().values.contains_key(key)
    }

    /// How many times `key` has been published.
    pub fn publish_count(&self, key: &str) -> usize {
        self.state.lock().publishes.get(key).copied().unwrap_or(0)
    }

    /// Keys released so far, in release order.
    pub fn released(&self) -> Vec<String> {
        self.state.lock().released.clone()
    }
}

impl ReactiveHost for MemoryHost {
    fn register_or_update(&self, key: &str, value: BoundValue) {
        let mut st = self.state.lock();
        st.values.insert(key.to_string(), value);
        *st.publishes.entry(key.to_string()).or_default() += 1;
    }

    fn release(&self, key: &str) {
        self.state.lock().released.push(key.to_string());
    }
}
