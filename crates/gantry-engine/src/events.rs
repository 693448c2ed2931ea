//! Instance-scoped subscriptions to world events.
//!
//! Subscriptions belong to the instance that made them and are dropped
//! with it. An event that carries a position reaches only the instance
//! whose structure contains that position; unpositioned events reach
//! every subscriber of the topic.

use std::fmt;

use gantry_core::{AssertionFailure, InstanceId, WorldEvent};
use indexmap::IndexMap;

use crate::context::TestContext;

/// Event handler. An `Err` fails the subscribing test.
pub type Handler =
    Box<dyn FnMut(&mut TestContext<'_>, &WorldEvent) -> Result<(), AssertionFailure>>;

/// Names one subscription of one instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle {
    /// Owning instance.
    pub instance: InstanceId,
    /// Per-instance sequence number.
    pub id: u64,
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/sub{}", self.instance, self.id)
    }
}

struct Subscription {
    topic: String,
    handler: Handler,
}

/// Every live subscription, in subscription order.
#[derive(Default)]
pub struct EventBus {
    subscriptions: IndexMap<SubscriptionHandle, Subscription>,
}

impl EventBus {
    /// An empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether no subscriptions are live.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Live subscriptions held by `instance`.
    pub fn subscriptions_of(&self, instance: InstanceId) -> usize {
        self.subscriptions
            .keys()
            .filter(|h| h.instance == instance)
            .count()
    }

    pub(crate) fn subscribe(
        &mut self,
        handle: SubscriptionHandle,
        topic: String,
        handler: Handler,
    ) {
        self.subscriptions
            .insert(handle, Subscription { topic, handler });
    }

    /// Drop one subscription. Returns whether it was live.
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        self.subscriptions.shift_remove(&handle).is_some()
    }

    /// Drop every subscription of `instance`.
    pub fn release_instance(&mut self, instance: InstanceId) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|h, _| h.instance != instance);
        before - self.subscriptions.len()
    }

    /// Handles of `instance` subscribed to `topic`, in subscription order.
    pub(crate) fn handles_for(&self, instance: InstanceId, topic: &str) -> Vec<SubscriptionHandle> {
        self.subscriptions
            .iter()
            .filter(|(h, s)| h.instance == instance && s.topic == topic)
            .map(|(h, _)| *h)
            .collect()
    }

    /// Run the handler behind `handle`, if it is still live.
    pub(crate) fn deliver(
        &mut self,
        handle: SubscriptionHandle,
        ctx: &mut TestContext<'_>,
        event: &WorldEvent,
    ) -> Option<Result<(), AssertionFailure>> {
        let sub = self.subscriptions.get_mut(&handle)?;
        Some((sub.handler)(ctx, event))
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.subscriptions.iter().map(|(h, s)| (h, &s.topic)))
            .finish()
    }
}
