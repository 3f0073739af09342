//! FeedController<T>: an in-memory change feed driven by the caller.
//!
//! Useful for embedding local data sources and for tests: notifications
//! pushed through the controller reach every current subscriber in
//! subscription order. The subscriber list is snapshotted before delivery and
//! the lock is released before any listener runs, so listeners may subscribe
//! or unsubscribe re-entrantly.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    error::FeedError,
    types::{ChangeBatch, RawDocument},
};

use super::{ChangeFeed, Listener, SourceDescriptor, Unsubscribe};

struct Subscriber<T> {
    id: u64,
    on_next: Listener<T>,
    on_error: Listener<FeedError>,
}

struct FeedState<T> {
    subscribers: Vec<Subscriber<T>>,
    next_id: u64,
    /// Delivered to each new subscriber from inside `subscribe`.
    initial: Option<T>,
    total_subscriptions: usize,
}

/// Caller-driven [`ChangeFeed`]. Cloning shares the same subscriber list.
pub struct FeedController<T> {
    state: Arc<Mutex<FeedState<T>>>,
}

impl<T> Clone for FeedController<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Clone + Send + 'static> FeedController<T> {
    /// A controller with no subscribers and no initial item.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FeedState {
                subscribers: Vec::new(),
                next_id: 1,
                initial: None,
                total_subscriptions: 0,
            })),
        }
    }

    /// Deliver `initial` synchronously to every future subscriber.
    pub fn with_initial(self, initial: T) -> Self {
        self.state.lock().initial = Some(initial);
        self
    }

    /// Deliver `item` to every current subscriber. Returns how many received it.
    pub fn push(&self, item: T) -> usize {
        let listeners: Vec<Listener<T>> = self.listeners();
        for listener in &listeners {
            listener(item.clone());
        }
        listeners.len()
    }

    /// Report `error` to every current subscriber. Returns how many received it.
    pub fn fail(&self, error: FeedError) -> usize {
        let listeners: Vec<Listener<FeedError>> = {
            let st = self.state.lock();
            st.subscribers.iter().map(|s| Arc::clone(&s.on_error)).collect()
        };
        for listener in &listeners {
            listener(error.clone());
        }
        listeners.len()
    }

    /// Snapshot of the current `on_next` listeners.
    ///
    /// A listener obtained here keeps working after its subscription is
    /// cancelled, which models a notification already in flight.
    pub fn listeners(&self) -> Vec<Listener<T>> {
        let st = self.state.lock();
        st.subscribers.iter().map(|s| Arc::clone(&s.on_next)).collect()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    /// Number of subscriptions ever opened.
    pub fn total_subscriptions(&self) -> usize {
        self.state.lock().total_subscriptions
    }
}

impl<T: Clone + Send + 'static> Default for FeedController<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> ChangeFeed<T> for FeedController<T> {
    fn subscribe(&self, on_next: Listener<T>, on_error: Listener<FeedError>) -> Unsubscribe {
        let (id, initial) = {
            let mut st = self.state.lock();
            let id = st.next_id;
            st.next_id += 1;
            st.total_subscriptions += 1;
            st.subscribers.push(Subscriber {
                id,
                on_next: Arc::clone(&on_next),
                on_error,
            });
            (id, st.initial.clone())
        };

        // Lock released: the listener may re-enter the controller.
        if let Some(item) = initial {
            on_next(item);
        }

        let state = Arc::clone(&self.state);
        Box::new(move || {
            state.lock().subscribers.retain(|s| s.id != id);
        })
    }
}

impl FeedController<ChangeBatch> {
    /// A collection descriptor backed by this controller.
    pub fn as_collection(&self) -> SourceDescriptor {
        SourceDescriptor::Collection(Arc::new(self.clone()))
    }
}

impl FeedController<RawDocument> {
    /// A document descriptor backed by this controller.
    pub fn as_document(&self) -> SourceDescriptor {
        SourceDescriptor::Document(Arc::new(self.clone()))
    }
}
