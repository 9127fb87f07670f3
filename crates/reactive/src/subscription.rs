//! Subscription management.
//!
//! A `SubscriptionManager<T>` keeps the callbacks interested in values of
//! type `T`: committed result windows for live queries, local change events
//! for a collection.

use alloc::boxed::Box;
use hashbrown::HashMap;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback invoked with each notified value.
pub type Callback<T> = Box<dyn Fn(&T)>;

/// A single subscription.
pub struct Subscription<T: ?Sized> {
    id: SubscriptionId,
    callback: Callback<T>,
}

impl<T: ?Sized> Subscription<T> {
    pub fn new<F>(id: SubscriptionId, callback: F) -> Self
    where
        F: Fn(&T) + 'static,
    {
        Self {
            id,
            callback: Box::new(callback),
        }
    }

    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn notify(&self, value: &T) {
        (self.callback)(value);
    }
}

/// Keeps the subscriptions of one notification source.
pub struct SubscriptionManager<T: ?Sized> {
    subscriptions: HashMap<SubscriptionId, Subscription<T>>,
    next_id: SubscriptionId,
}

impl<T: ?Sized> Default for SubscriptionManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> SubscriptionManager<T> {
    pub fn new() -> Self {
        Self {
            subscriptions: HashMap::new(),
            next_id: 1,
        }
    }

    /// Registers a callback and returns the id to unsubscribe with.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.subscriptions.insert(id, Subscription::new(id, callback));
        id
    }

    /// Returns true if the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    /// Notifies every subscription.
    pub fn notify_all(&self, value: &T) {
        for sub in self.subscriptions.values() {
            sub.notify(value);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

impl<T: ?Sized> core::fmt::Debug for SubscriptionManager<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
