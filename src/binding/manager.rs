//! SubscriptionManager: one live binding per key on a host object.
//!
//! # Locking
//!
//! Three kinds of locks are used:
//!   - `table`: key → binding entry (`Arc<Mutex<..>>`; callbacks hold a
//!     `Weak` so they never keep a discarded table alive).
//!   - one `slot` per binding: liveness, phase, current value, sequence
//!     counter and the pending initial sender. Batches are applied while the
//!     slot is locked, so a batch and an `unbind` for the same key never
//!     interleave.
//!   - one publish `gate` per binding (`ReentrantMutex`): held while the
//!     binding's value is handed to the host and its events are emitted, so
//!     host updates for one key land in sequence order and never after
//!     `release`. It is re-entrant, so a host or listener may unbind the key
//!     from inside a callback.
//!
//! Lock order is `gate` → `slot`; `table` is never held together with either.
//! No lock is held while calling `ChangeFeed::subscribe` (feeds may deliver
//! synchronously from inside `subscribe`).

use std::cell::Cell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::oneshot;

use crate::{
    error::{BindError, FeedError, ReplicaError},
    feed::{ChangeFeed, Listener, SourceDescriptor, Unsubscribe},
    reactive::{BindingEvent, EventEmitter, ReactiveHost},
    replica::{self, BatchSummary},
    types::{ChangeBatch, RawDocument},
};

use super::types::{BinderOptions, BindingPhase, BoundValue, KeyedHandle, ReplicaHandle};

type InitialSender = oneshot::Sender<Result<BoundValue, BindError>>;
type Table = Mutex<HashMap<String, BindingEntry>>;
/// Sequence number of the last value handed to the host.
type PublishGate = ReentrantMutex<Cell<u64>>;

// ============================================================================
// Internal state
// ============================================================================

struct BindingEntry {
    id: u64,
    slot: Arc<Mutex<Slot>>,
    gate: Arc<PublishGate>,
    /// `None` until `subscribe` has returned.
    unsubscribe: Option<Unsubscribe>,
}

struct Slot {
    /// Cleared by `unbind` and by a failed first notification; a dead slot
    /// drops every notification that still reaches it.
    live: bool,
    phase: BindingPhase,
    value: BoundValue,
    initial: Option<InitialSender>,
    /// Bumped for every applied notification.
    seq: u64,
}

enum Source {
    Collection(Arc<dyn ChangeFeed<ChangeBatch>>, ReplicaHandle),
    Keyed(Arc<dyn ChangeFeed<ChangeBatch>>, KeyedHandle),
    Document(Arc<dyn ChangeFeed<RawDocument>>),
}

impl Source {
    fn initial_value(&self) -> BoundValue {
        match self {
            Self::Collection(_, handle) => BoundValue::Collection(handle.clone()),
            Self::Keyed(_, handle) => BoundValue::Keyed(handle.clone()),
            Self::Document(_) => BoundValue::Pending,
        }
    }
}

struct Applied {
    seq: u64,
    first: bool,
    initial: Option<InitialSender>,
    value: BoundValue,
    summary: Option<BatchSummary>,
}

/// What a notification did, decided under the slot lock and acted on after.
enum Outcome {
    Dropped,
    Applied(Applied),
    InitialFailure {
        initial: Option<InitialSender>,
        error: BindError,
    },
    LateFailure(BindError),
}

/// Everything a feed callback needs, shared by its `on_next` and `on_error`.
struct BindingContext {
    key: String,
    binding_id: u64,
    slot: Arc<Mutex<Slot>>,
    gate: Arc<PublishGate>,
    table: Weak<Table>,
    host: Arc<dyn ReactiveHost>,
    emitter: Arc<EventEmitter<BindingEvent>>,
    id_field: String,
}

impl BindingContext {
    /// Run `apply` against the bound replica under the slot lock.
    fn on_batch(&self, apply: impl FnOnce() -> Result<BatchSummary, ReplicaError>) {
        let outcome = {
            let mut slot = self.slot.lock();
            if !slot.live {
                Outcome::Dropped
            } else {
                match apply() {
                    Ok(summary) => Self::settle(&mut slot, Some(summary)),
                    Err(source) => {
                        let error = BindError::Replica {
                            key: self.key.clone(),
                            source,
                        };
                        Self::fail(&mut slot, error)
                    }
                }
            }
        };
        self.finish(outcome);
    }

    fn on_document(&self, doc: RawDocument) {
        let outcome = {
            let mut slot = self.slot.lock();
            if !slot.live {
                Outcome::Dropped
            } else if !doc.exists {
                Self::fail(&mut slot, BindError::DocumentNotFound(self.key.clone()))
            } else {
                match replica::normalize(&doc, &self.id_field) {
                    Ok(record) => {
                        slot.value = BoundValue::Document(record);
                        Self::settle(&mut slot, None)
                    }
                    Err(source) => {
                        let error = BindError::Replica {
                            key: self.key.clone(),
                            source,
                        };
                        Self::fail(&mut slot, error)
                    }
                }
            }
        };
        self.finish(outcome);
    }

    fn on_error(&self, error: FeedError) {
        let outcome = {
            let mut slot = self.slot.lock();
            if !slot.live {
                Outcome::Dropped
            } else {
                Self::fail(&mut slot, BindError::from_feed(&self.key, error))
            }
        };
        self.finish(outcome);
    }

    fn settle(slot: &mut Slot, summary: Option<BatchSummary>) -> Outcome {
        let first = slot.phase == BindingPhase::Subscribing;
        slot.phase = BindingPhase::Active;
        slot.seq += 1;
        Outcome::Applied(Applied {
            seq: slot.seq,
            first,
            initial: slot.initial.take(),
            value: slot.value.clone(),
            summary,
        })
    }

    fn fail(slot: &mut Slot, error: BindError) -> Outcome {
        match slot.phase {
            BindingPhase::Subscribing => {
                slot.live = false;
                Outcome::InitialFailure {
                    initial: slot.initial.take(),
                    error,
                }
            }
            BindingPhase::Active => Outcome::LateFailure(error),
        }
    }

    fn is_live(&self) -> bool {
        self.slot.lock().live
    }

    fn finish(&self, outcome: Outcome) {
        let key = self.key.as_str();
        match outcome {
            Outcome::Dropped => {
                tracing::warn!(key, "dropping notification for unbound key");
            }
            Outcome::Applied(applied) => self.publish(applied),
            Outcome::InitialFailure { initial, error } => {
                tracing::warn!(
                    key,
                    error = %error,
                    "first notification failed, dropping binding"
                );
                self.detach();
                let _gate = self.gate.lock();
                self.host.release(key);
                if let Some(tx) = initial {
                    let _ = tx.send(Err(error.clone()));
                }
                self.emitter.emit(&BindingEvent::Error {
                    key: key.to_string(),
                    error,
                    initial: true,
                });
            }
            Outcome::LateFailure(error) => {
                tracing::warn!(key, error = %error, "change feed notification failed");
                let _gate = self.gate.lock();
                if !self.is_live() {
                    return;
                }
                self.emitter.emit(&BindingEvent::Error {
                    key: key.to_string(),
                    error,
                    initial: false,
                });
            }
        }
    }

    /// Hand an applied value to the host and report it.
    ///
    /// Skipped entirely once the binding is dead. A value older than the one
    /// already published is not handed to the host again.
    fn publish(&self, applied: Applied) {
        let Applied {
            seq,
            first,
            initial,
            value,
            summary,
        } = applied;
        let key = self.key.as_str();

        let gate = self.gate.lock();
        if !self.is_live() {
            tracing::warn!(key, seq, "binding removed before publish, dropping notification");
            return;
        }
        let stale = seq <= gate.get();
        if stale {
            tracing::debug!(key, seq, published = gate.get(), "newer value already published");
        } else {
            if let Some(s) = &summary {
                tracing::debug!(
                    key,
                    inserted = s.inserted,
                    removed = s.removed,
                    replaced = s.replaced,
                    moved = s.moved,
                    "applied change batch"
                );
            }
            self.host.register_or_update(key, value.clone());
            gate.set(gate.get().max(seq));
        }

        if let Some(tx) = initial {
            if tx.send(Ok(value)).is_err() {
                tracing::debug!(key, "initial value resolved with no awaiting caller");
            }
        }
        if !self.is_live() {
            return;
        }
        if first {
            self.emitter.emit(&BindingEvent::Resolved {
                key: key.to_string(),
            });
        } else if !stale {
            self.emitter.emit(&BindingEvent::Updated {
                key: key.to_string(),
                summary,
            });
        }
    }

    /// Remove this binding's own table entry (not a later rebind of the same
    /// key) and detach its feed.
    fn detach(&self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        let removed = {
            let mut table = table.lock();
            match table.get(&self.key) {
                Some(entry) if entry.id == self.binding_id => table.remove(&self.key),
                _ => None,
            }
        };
        if let Some(unsubscribe) = removed.and_then(|entry| entry.unsubscribe) {
            unsubscribe();
        }
    }
}

// ============================================================================
// InitialValue
// ============================================================================

/// Future settling once with a binding's first notification.
///
/// The binding is live whether or not this future is awaited; dropping it
/// only discards the initial result.
pub struct InitialValue {
    key: String,
    binding_id: u64,
    rx: oneshot::Receiver<Result<BoundValue, BindError>>,
}

impl InitialValue {
    /// The key this binding was created for.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Future for InitialValue {
    type Output = Result<BoundValue, BindError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let polled = Pin::new(&mut self.rx).poll(cx);
        match polled {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(BindError::Cancelled(self.key.clone()))),
            Poll::Pending => Poll::Pending,
        }
    }
}

// ============================================================================
// SubscriptionManager
// ============================================================================

/// Binds keys of one host object to live sources.
///
/// At most one binding exists per key. Dropping the manager unbinds every key.
pub struct SubscriptionManager {
    host: Arc<dyn ReactiveHost>,
    options: BinderOptions,
    table: Arc<Table>,
    emitter: Arc<EventEmitter<BindingEvent>>,
    next_id: AtomicU64,
}

impl SubscriptionManager {
    /// A manager publishing into `host`.
    pub fn new(host: Arc<dyn ReactiveHost>, options: BinderOptions) -> Self {
        Self {
            host,
            options,
            table: Arc::new(Mutex::new(HashMap::new())),
            emitter: Arc::new(EventEmitter::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Options this manager was created with.
    pub fn options(&self) -> &BinderOptions {
        &self.options
    }

    // -----------------------------------------------------------------------
    // Binding
    // -----------------------------------------------------------------------

    /// Bind `key` to `descriptor`.
    ///
    /// Fails immediately with [`BindError::DuplicateBinding`] if `key` is
    /// already bound. Otherwise the initial container is published to the
    /// host, the feed is opened, and the returned future settles with the
    /// first notification.
    pub fn bind(
        &self,
        key: impl Into<String>,
        descriptor: SourceDescriptor,
    ) -> Result<InitialValue, BindError> {
        let source = match descriptor {
            SourceDescriptor::Collection(feed) => Source::Collection(feed, ReplicaHandle::new()),
            SourceDescriptor::Document(feed) => Source::Document(feed),
        };
        self.open(key.into(), source)
    }

    /// Bind `key` to a collection mirrored as an id → fields map.
    pub fn bind_keyed(
        &self,
        key: impl Into<String>,
        feed: Arc<dyn ChangeFeed<ChangeBatch>>,
    ) -> Result<InitialValue, BindError> {
        self.open(key.into(), Source::Keyed(feed, KeyedHandle::new()))
    }

    /// Bind and wait for the first notification.
    ///
    /// With [`BinderOptions::initial_timeout`] set, a binding still waiting
    /// for its first notification at the deadline is unbound and
    /// [`BindError::InitialTimeout`] returned. A binding that settled in the
    /// meantime, or a later rebind of the same key, is left alone.
    pub async fn bind_one(
        &self,
        key: impl Into<String>,
        descriptor: SourceDescriptor,
    ) -> Result<BoundValue, BindError> {
        let key = key.into();
        let mut pending = self.bind(key.clone(), descriptor)?;
        let Some(after) = self.options.initial_timeout else {
            return pending.await;
        };
        match tokio::time::timeout(after, &mut pending).await {
            Ok(result) => result,
            Err(_) if self.expire(&key, pending.binding_id) => {
                tracing::warn!(key = %key, ?after, "no initial notification, unbinding");
                Err(BindError::InitialTimeout { key, after })
            }
            Err(_) => pending.await,
        }
    }

    fn open(&self, key: String, source: Source) -> Result<InitialValue, BindError> {
        let binding_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let initial_value = source.initial_value();
        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(Mutex::new(Slot {
            live: true,
            phase: BindingPhase::Subscribing,
            value: initial_value.clone(),
            initial: Some(tx),
            seq: 0,
        }));
        let gate = Arc::new(ReentrantMutex::new(Cell::new(0)));

        {
            let mut table = self.table.lock();
            if table.contains_key(&key) {
                return Err(BindError::DuplicateBinding(key));
            }
            table.insert(
                key.clone(),
                BindingEntry {
                    id: binding_id,
                    slot: Arc::clone(&slot),
                    gate: Arc::clone(&gate),
                    unsubscribe: None,
                },
            );
        }
        tracing::debug!(key = %key, binding_id, "binding key");

        {
            let _gate = gate.lock();
            if slot.lock().live {
                self.host.register_or_update(&key, initial_value);
            }
        }

        let ctx = Arc::new(BindingContext {
            key: key.clone(),
            binding_id,
            slot,
            gate,
            table: Arc::downgrade(&self.table),
            host: Arc::clone(&self.host),
            emitter: Arc::clone(&self.emitter),
            id_field: self.options.id_field.clone(),
        });
        let on_error: Listener<FeedError> = {
            let ctx = Arc::clone(&ctx);
            Arc::new(move |error: FeedError| ctx.on_error(error))
        };
        let unsubscribe = match source {
            Source::Collection(feed, handle) => {
                let on_next: Listener<ChangeBatch> = Arc::new(move |batch: ChangeBatch| {
                    ctx.on_batch(|| handle.write(|r| replica::apply(r, &batch, &ctx.id_field)))
                });
                feed.subscribe(on_next, on_error)
            }
            Source::Keyed(feed, handle) => {
                let on_next: Listener<ChangeBatch> = Arc::new(move |batch: ChangeBatch| {
                    ctx.on_batch(|| handle.write(|r| replica::apply_keyed(r, &batch)))
                });
                feed.subscribe(on_next, on_error)
            }
            Source::Document(feed) => {
                let on_next: Listener<RawDocument> =
                    Arc::new(move |doc: RawDocument| ctx.on_document(doc));
                feed.subscribe(on_next, on_error)
            }
        };
        self.attach(&key, binding_id, unsubscribe);

        Ok(InitialValue {
            key,
            binding_id,
            rx,
        })
    }

    /// Store the feed handle on the entry, or detach right away if the
    /// binding was already removed while `subscribe` ran.
    fn attach(&self, key: &str, binding_id: u64, unsubscribe: Unsubscribe) {
        let orphaned = {
            let mut table = self.table.lock();
            match table.get_mut(key) {
                Some(entry) if entry.id == binding_id => {
                    entry.unsubscribe = Some(unsubscribe);
                    None
                }
                _ => Some(unsubscribe),
            }
        };
        if let Some(unsubscribe) = orphaned {
            unsubscribe();
        }
    }

    // -----------------------------------------------------------------------
    // Unbinding
    // -----------------------------------------------------------------------

    /// Unbind `key`: no further notification touches its value once this
    /// returns. Returns whether a binding existed; unbinding an unbound key
    /// is a no-op.
    pub fn unbind(&self, key: &str) -> bool {
        let Some(entry) = self.table.lock().remove(key) else {
            return false;
        };
        self.close(key, entry);
        true
    }

    /// Unbind every key. Returns how many bindings were removed.
    pub fn teardown_all(&self) -> usize {
        let keys = self.keys();
        keys.iter().filter(|key| self.unbind(key)).count()
    }

    /// Unbind binding `binding_id` of `key` if it is still waiting for its
    /// first notification.
    fn expire(&self, key: &str, binding_id: u64) -> bool {
        let slot = {
            let table = self.table.lock();
            match table.get(key) {
                Some(entry) if entry.id == binding_id => Arc::clone(&entry.slot),
                _ => return false,
            }
        };
        {
            let mut slot = slot.lock();
            if !slot.live || slot.phase != BindingPhase::Subscribing {
                return false;
            }
            slot.live = false;
        }
        let entry = {
            let mut table = self.table.lock();
            match table.get(key) {
                Some(entry) if entry.id == binding_id => table.remove(key),
                _ => None,
            }
        };
        match entry {
            Some(entry) => {
                self.close(key, entry);
                true
            }
            None => false,
        }
    }

    /// Kill a binding already removed from the table.
    fn close(&self, key: &str, entry: BindingEntry) {
        let initial = {
            let mut slot = entry.slot.lock();
            slot.live = false;
            slot.initial.take()
        };
        if let Some(unsubscribe) = entry.unsubscribe {
            unsubscribe();
        }
        if let Some(tx) = initial {
            let _ = tx.send(Err(BindError::Cancelled(key.to_string())));
        }

        tracing::debug!(key, "unbound key");
        let _gate = entry.gate.lock();
        self.host.release(key);
        self.emitter.emit(&BindingEvent::Unbound {
            key: key.to_string(),
        });
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// True while `key` has a binding.
    pub fn is_bound(&self, key: &str) -> bool {
        self.table.lock().contains_key(key)
    }

    /// Bound keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.table.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of bound keys.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    /// True when no key is bound.
    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }

    /// Lifecycle phase of the binding for `key`.
    pub fn phase(&self, key: &str) -> Option<BindingPhase> {
        let slot = self.slot(key)?;
        let phase = slot.lock().phase;
        Some(phase)
    }

    /// Current value bound to `key`.
    pub fn value(&self, key: &str) -> Option<BoundValue> {
        let slot = self.slot(key)?;
        let value = slot.lock().value.clone();
        Some(value)
    }

    fn slot(&self, key: &str) -> Option<Arc<Mutex<Slot>>> {
        self.table.lock().get(key).map(|entry| Arc::clone(&entry.slot))
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Register a callback for every [`BindingEvent`] of this manager.
    ///
    /// Events for one key arrive in order; `Unbound` is the last event of a
    /// binding. Returns an [`Unsubscribe`] closure.
    pub fn on_event(
        &self,
        callback: impl Fn(&BindingEvent) + Send + Sync + 'static,
    ) -> Unsubscribe {
        let listener_id = self.emitter.on(callback);
        let emitter = Arc::clone(&self.emitter);
        Box::new(move || emitter.off(listener_id))
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        let removed = self.teardown_all();
        if removed > 0 {
            tracing::debug!(removed, "subscription manager dropped with live bindings");
        }
    }
}
