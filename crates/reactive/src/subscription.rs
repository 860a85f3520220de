//! Subscription management for observable queries.
//!
//! This module provides subscription IDs and a manager for tracking the
//! observers attached to one query.

use alloc::rc::Rc;
use alloc::vec::Vec;
use hashbrown::HashMap;
use weft_core::ResultEnvelope;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Receives result envelopes.
pub trait Observer {
    /// Called with each delivered envelope.
    fn notify(&self, envelope: &ResultEnvelope);
}

impl<F> Observer for F
where
    F: Fn(&ResultEnvelope),
{
    fn notify(&self, envelope: &ResultEnvelope) {
        self(envelope)
    }
}

/// Manages the observers of an observable query.
///
/// Observers are handed out as shared handles so callers can release any
/// borrow on the owning state before invoking them.
pub struct SubscriptionManager {
    /// Active observers
    observers: HashMap<SubscriptionId, Rc<dyn Observer>>,
    /// Next subscription ID to assign
    next_id: SubscriptionId,
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionManager {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            observers: HashMap::new(),
            next_id: 1,
        }
    }

    /// Attaches an observer.
    ///
    /// Returns the subscription ID that can be used to unsubscribe.
    pub fn subscribe<O>(&mut self, observer: O) -> SubscriptionId
    where
        O: Observer + 'static,
    {
        self.subscribe_shared(Rc::new(observer))
    }

    /// Attaches an already shared observer.
    pub fn subscribe_shared(&mut self, observer: Rc<dyn Observer>) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.observers.insert(id, observer);
        id
    }

    /// Unsubscribes by ID.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.remove(&id).is_some()
    }

    /// Returns the observer for a subscription.
    pub fn get(&self, id: SubscriptionId) -> Option<Rc<dyn Observer>> {
        self.observers.get(&id).cloned()
    }

    /// Returns true if the subscription is active.
    #[inline]
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.observers.contains_key(&id)
    }

    /// Returns the number of active subscriptions.
    #[inline]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns true if there are no subscriptions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Returns all subscription IDs in subscription order.
    pub fn subscription_ids(&self) -> Vec<SubscriptionId> {
        let mut ids: Vec<_> = self.observers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
