//! Reactive layer: the host boundary and the binding event stream.
//!
//! # Modules
//!
//! - [`host`]: [`ReactiveHost`] trait and the in-memory [`MemoryHost`].
//! - [`event`]: [`BindingEvent`] enum.
//! - [`event_emitter`]: Generic typed pub/sub ([`EventEmitter<T>`]).

pub mod event;
pub mod event_emitter;
pub mod host;

pub use event::BindingEvent;
pub use event_emitter::{EventEmitter, ListenerId};
pub use host::{MemoryHost, ReactiveHost};
