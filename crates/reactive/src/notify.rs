//! Per-observer result deduplication.
//!
//! This module provides `ResultNotifier`, which remembers the last envelope
//! handed to each observer and suppresses deliveries that would repeat it.

use crate::subscription::SubscriptionId;
use hashbrown::HashMap;
use weft_core::ResultEnvelope;

/// Tracks the last envelope delivered to each observer.
#[derive(Default)]
pub struct ResultNotifier {
    delivered: HashMap<SubscriptionId, ResultEnvelope>,
}

impl ResultNotifier {
    /// Creates an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides whether `envelope` should be delivered to `id`.
    ///
    /// Returns false when it equals the last envelope delivered to that
    /// observer. Otherwise records it as delivered and returns true.
    pub fn should_deliver(&mut self, id: SubscriptionId, envelope: &ResultEnvelope) -> bool {
        match self.delivered.get(&id) {
            Some(last) if last == envelope => {
                log::trace!("suppressed repeat delivery to subscription {}", id);
                false
            }
            _ => {
                self.delivered.insert(id, envelope.clone());
                true
            }
        }
    }

    /// Drops the history of an observer.
    pub fn forget(&mut self, id: SubscriptionId) {
        self.delivered.remove(&id);
    }
}
