//! Internal event source driven by the adapter.
//!
//! The emitter knows nothing about transports or subscribers; it only fans
//! each event out to its registered listeners, synchronously and in
//! registration order. There is no buffering: a listener registered after
//! an event was emitted never sees that event and has to read the current
//! state itself.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::{AdapterStatus, FlagSet};

#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    StatusChanged(AdapterStatus),
    FlagsChanged(FlagSet),
}

/// Callback type for emitter listeners.
pub type EventListener = Arc<dyn Fn(&AdapterEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct UpdateEmitter {
    listeners: RwLock<Vec<(ListenerId, EventListener)>>,
    next_id: AtomicU64,
}

impl UpdateEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for every future event.
    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&AdapterEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn emit(&self, event: &AdapterEvent) {
        // Listeners run without the lock held so they may call on/off.
        let listeners: Vec<EventListener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}
