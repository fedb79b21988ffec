//! Fixed-capacity table of topics the device wants to receive.

use super::session::{BrokerSession, QoS};
use heapless::{String, Vec};

/// Default number of subscription slots.
pub const MAX_SUBSCRIPTIONS: usize = 25;

/// Maximum topic length stored in a slot.
pub const MAX_TOPIC_LEN: usize = 128;

/// One slot of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionEntry {
    /// Subscribed topic filter.
    pub topic: String<MAX_TOPIC_LEN>,
    /// Requested delivery level.
    pub qos: QoS,
    /// Whether the slot holds a live entry.
    pub in_use: bool,
}

impl Default for SubscriptionEntry {
    fn default() -> Self {
        Self {
            topic: String::new(),
            qos: QoS::AtLeastOnce,
            in_use: false,
        }
    }
}

/// Registered subscriptions, replayed after every new broker session.
///
/// Freed slots are reused; entries have no ordering guarantee.
#[derive(Debug, Clone)]
pub struct SubscriptionRegistry<const N: usize = MAX_SUBSCRIPTIONS> {
    slots: Vec<SubscriptionEntry, N>,
}

impl<const N: usize> Default for SubscriptionRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SubscriptionRegistry<N> {
    /// An empty registry.
    pub fn new() -> Self {
        let mut slots = Vec::new();
        while slots.push(SubscriptionEntry::default()).is_ok() {}
        Self { slots }
    }

    /// Register `topic` in the first free slot.
    ///
    /// Returns `false`, leaving the table untouched, when the topic is empty,
    /// too long or every slot is taken. Registering a topic that is already
    /// present succeeds without using another slot.
    pub fn add(&mut self, topic: &str, qos: QoS) -> bool {
        if topic.is_empty() {
            return false;
        }
        if self.contains(topic) {
            return true;
        }
        let Ok(owned) = String::<MAX_TOPIC_LEN>::try_from(topic) else {
            return false;
        };
        match self.slots.iter_mut().find(|slot| !slot.in_use) {
            Some(slot) => {
                slot.topic = owned;
                slot.qos = qos;
                slot.in_use = true;
                true
            }
            None => false,
        }
    }

    /// Free the slot holding `topic` and unsubscribe from it.
    ///
    /// The unsubscribe is sent whatever the session state; a session that is
    /// down simply fails the call. Returns `true` if a slot was freed.
    pub fn remove<B: BrokerSession>(&mut self, topic: &str, session: &mut B) -> bool {
        let Some(slot) = self
            .slots
            .iter_mut()
            .find(|slot| slot.in_use && slot.topic.as_str() == topic)
        else {
            return false;
        };
        slot.in_use = false;
        slot.topic.clear();
        if session.unsubscribe(topic).is_err() {
            debug!("unsubscribe failed while removing a subscription");
        }
        true
    }

    /// Subscribe to every registered topic, calling `yield_now` between
    /// entries. Returns how many subscribes the session accepted.
    pub fn replay<B: BrokerSession>(&self, session: &mut B, mut yield_now: impl FnMut()) -> usize {
        let mut accepted = 0;
        for slot in self.slots.iter().filter(|slot| slot.in_use) {
            if session.subscribe(&slot.topic, slot.qos).is_ok() {
                accepted += 1;
            }
            yield_now();
        }
        accepted
    }

    /// `true` if `topic` is registered.
    pub fn contains(&self, topic: &str) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.in_use && slot.topic.as_str() == topic)
    }

    /// Iterator over the registered entries.
    pub fn iter(&self) -> impl Iterator<Item = &SubscriptionEntry> {
        self.slots.iter().filter(|slot| slot.in_use)
    }

    /// Number of registered topics.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of slots.
    pub const fn capacity(&self) -> usize {
        N
    }
}
