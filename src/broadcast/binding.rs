use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use super::channel::{BroadcastChannel, BroadcastState, SubscriptionToken};

/// One consumer's attachment to a [`BroadcastChannel`].
///
/// The binding remembers the slice it last delivered and calls its owner
/// only when a publish produces a different slice, so a consumer watching
/// one flag is not woken when other flags change.
///
/// Dropping the binding unsubscribes it, which also covers owners that
/// unwind on error.
pub struct SubscriberBinding<T> {
    token: Option<SubscriptionToken>,
    last_delivered: Arc<Mutex<T>>,
}

impl<T> SubscriberBinding<T>
where
    T: PartialEq + Clone + Send + 'static,
{
    /// Attaches to `channel`.
    ///
    /// The slice of the channel's current state is recorded as delivered
    /// and available through [`current`](Self::current); `on_change` is
    /// only called for later publishes.
    pub fn attach<S, F>(channel: &BroadcastChannel, selector: S, on_change: F) -> Self
    where
        S: Fn(&BroadcastState) -> T + Send + Sync + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let last_delivered = Arc::new(Mutex::new(selector(channel.state().as_ref())));

        let last = Arc::clone(&last_delivered);
        let token = channel.subscribe(selector, move |slice: T| {
            {
                let mut last = last.lock();
                if *last == slice {
                    return;
                }
                *last = slice.clone();
            }
            on_change(slice);
        });

        Self {
            token: Some(token),
            last_delivered,
        }
    }

    /// The slice most recently delivered to the owner.
    pub fn current(&self) -> T {
        self.last_delivered.lock().clone()
    }
}

impl<T> SubscriberBinding<T> {
    pub fn is_attached(&self) -> bool {
        self.token.as_ref().is_some_and(SubscriptionToken::is_active)
    }

    /// Unsubscribes now instead of on drop.
    pub fn detach(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(token) = self.token.take() {
            token.unsubscribe();
        }
    }
}

impl<T> Drop for SubscriberBinding<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: fmt::Debug> fmt::Debug for SubscriberBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberBinding")
            .field("attached", &self.token.is_some())
            .field("last_delivered", &*self.last_delivered.lock())
            .finish()
    }
}
