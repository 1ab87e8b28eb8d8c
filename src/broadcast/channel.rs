//! Publish/subscribe channel carrying adapter status and flags.
//!
//! A channel is created once at the top of a consumer tree and handed to
//! every consumer by reference or clone; all clones share the same state
//! and subscriber list. Subscribers only ever see `&BroadcastState` and
//! cannot change what other subscribers observe.

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::types::{AdapterStatus, FlagSet};

/// Snapshot of everything the channel distributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BroadcastState {
    pub status: AdapterStatus,
    pub flags: FlagSet,
}

type StateListener = Arc<dyn Fn(&BroadcastState) + Send + Sync>;

struct ChannelInner {
    state: RwLock<Arc<BroadcastState>>,
    subscribers: Mutex<Vec<(u64, StateListener)>>,
    next_id: AtomicU64,
}

impl ChannelInner {
    fn remove(&self, id: u64) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(subscriber_id, _)| *subscriber_id != id);
        subscribers.len() != before
    }
}

#[derive(Clone)]
pub struct BroadcastChannel {
    inner: Arc<ChannelInner>,
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastChannel {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                state: RwLock::new(Arc::new(BroadcastState::default())),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// The state of the latest publish.
    pub fn state(&self) -> Arc<BroadcastState> {
        Arc::clone(&self.inner.state.read())
    }

    /// Replaces the held state and notifies every current subscriber.
    ///
    /// Subscribers are notified synchronously, in registration order, with
    /// the full new state. The set of subscribers is fixed when the publish
    /// starts: a subscriber removed during the notification may still get
    /// this publish, but none after it.
    pub fn publish(&self, status: AdapterStatus, flags: FlagSet) {
        let state = Arc::new(BroadcastState { status, flags });
        *self.inner.state.write() = Arc::clone(&state);

        let subscribers: Vec<StateListener> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for subscriber in subscribers {
            subscriber(&state);
        }
    }

    /// Registers `callback` to receive `selector(&state)` on every publish.
    ///
    /// Registering the same callback twice creates two independent
    /// subscriptions.
    pub fn subscribe<T, S, F>(&self, selector: S, callback: F) -> SubscriptionToken
    where
        S: Fn(&BroadcastState) -> T + Send + Sync + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let listener: StateListener =
            Arc::new(move |state: &BroadcastState| callback(selector(state)));
        self.inner.subscribers.lock().push((id, listener));

        SubscriptionToken {
            id,
            channel: Arc::downgrade(&self.inner),
        }
    }

    /// Removes a subscription. Does nothing if it was already removed or
    /// belongs to another channel.
    pub fn unsubscribe(&self, token: &SubscriptionToken) {
        if token.belongs_to(&self.inner) {
            self.inner.remove(token.id);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

impl fmt::Debug for BroadcastChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastChannel")
            .field("state", &self.state())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Identifies one subscription. Holds only a weak reference to its channel.
#[derive(Debug)]
pub struct SubscriptionToken {
    id: u64,
    channel: Weak<ChannelInner>,
}

impl SubscriptionToken {
    /// Removes this subscription from its channel, if both still exist.
    /// Returns `true` when a subscription was removed.
    pub fn unsubscribe(&self) -> bool {
        match self.channel.upgrade() {
            Some(channel) => channel.remove(self.id),
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.channel.upgrade().is_some_and(|channel| {
            channel
                .subscribers
                .lock()
                .iter()
                .any(|(id, _)| *id == self.id)
        })
    }

    fn belongs_to(&self, channel: &Arc<ChannelInner>) -> bool {
        std::ptr::eq(self.channel.as_ptr(), Arc::as_ptr(channel))
    }
}
