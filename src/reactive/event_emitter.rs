//! EventEmitter<T>: typed pub/sub used for the out-of-band binding channel.
//!
//! Listeners are `Arc<dyn Fn(&T)>`, so each emission works on a cheap
//! snapshot of the list:
//!   - a listener removed during an emission still sees that emission;
//!   - a listener added during an emission first sees the next one.
//!
//! The internal `parking_lot::Mutex` is never held while a listener runs, so
//! listeners may call `on()`/`off()` (or unbind keys) re-entrantly. A panic in
//! one listener is caught and logged; the remaining listeners still run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Returned by [`EventEmitter::on`]; pass to [`EventEmitter::off`].
pub type ListenerId = u64;

/// Closure type for event listeners.
pub type ListenerFn<T> = dyn Fn(&T) + Send + Sync;

struct Slot<T> {
    id: ListenerId,
    callback: Arc<ListenerFn<T>>,
}

pub struct EventEmitter<T> {
    slots: Mutex<Vec<Slot<T>>>,
    next_id: AtomicU64,
}

impl<T> EventEmitter<T> {
    /// An emitter with no listeners.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `callback`; it receives every subsequent event.
    pub fn on(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.slots.lock().push(Slot {
            id,
            callback: Arc::new(callback),
        });
        id
    }

    /// Remove the listener `id`. Unknown ids are ignored.
    pub fn off(&self, id: ListenerId) {
        self.slots.lock().retain(|slot| slot.id != id);
    }

    /// Remove every listener.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    /// Deliver `event` to the listeners registered at call time.
    /// Returns the number of listeners invoked.
    pub fn emit(&self, event: &T) -> usize {
        let snapshot: Vec<Arc<ListenerFn<T>>> = {
            let slots = self.slots.lock();
            slots.iter().map(|slot| Arc::clone(&slot.callback)).collect()
        };
        for callback in &snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(event)));
            if outcome.is_err() {
                tracing::warn!("binding event listener panicked");
            }
        }
        snapshot.len()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// True when no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}
