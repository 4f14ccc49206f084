use std::borrow::Cow;

use ahash::AHashMap;
use puente_ids::{BehaviorID, NodeID, SubscriptionID};
use serde_json::Value;

/// One host-event subscription: an opaque handle plus the behavior it
/// dispatches to. No closures — cancellation is handle removal.
#[derive(Debug, Clone, Copy)]
pub struct Subscription {
    pub id: SubscriptionID,
    pub behavior: BehaviorID,
}

/// Routes named host events to subscribed behaviors. Behaviors subscribe
/// during init and must be fully unsubscribed by the time their dispose
/// returns, so no event delivered afterwards can reach them.
pub struct EventRouter {
    by_event: AHashMap<&'static str, Vec<Subscription>>,
    by_id: AHashMap<SubscriptionID, &'static str>,
    next_id: u32,
}

impl EventRouter {
    pub fn new() -> Self {
        Self {
            by_event: AHashMap::default(),
            by_id: AHashMap::default(),
            next_id: 0,
        }
    }

    pub fn subscribe(&mut self, event: &'static str, behavior: BehaviorID) -> SubscriptionID {
        self.next_id += 1;
        let id = SubscriptionID::from_parts(self.next_id, 0);
        self.by_event
            .entry(event)
            .or_default()
            .push(Subscription { id, behavior });
        self.by_id.insert(id, event);
        id
    }

    pub fn cancel(&mut self, id: SubscriptionID) -> bool {
        let Some(event) = self.by_id.remove(&id) else {
            return false;
        };
        if let Some(subs) = self.by_event.get_mut(event) {
            subs.retain(|s| s.id != id);
        }
        true
    }

    pub fn cancel_all_for(&mut self, behavior: BehaviorID) {
        let by_id = &mut self.by_id;
        for subs in self.by_event.values_mut() {
            subs.retain(|s| {
                if s.behavior == behavior {
                    by_id.remove(&s.id);
                    false
                } else {
                    true
                }
            });
        }
    }

    /// Snapshot of the behaviors subscribed to `event` right now. A snapshot
    /// so handlers can (un)subscribe while the event is being routed.
    pub fn subscribers(&self, event: &str) -> Vec<BehaviorID> {
        self.by_event
            .get(event)
            .map(|subs| subs.iter().map(|s| s.behavior).collect())
            .unwrap_or_default()
    }

    pub fn subscription_count(&self) -> usize {
        self.by_id.len()
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// An event re-emitted onto a scene node for the application to observe,
/// e.g. a collision the host reported against a component's proxy.
#[derive(Debug, Clone)]
pub struct NodeEvent {
    pub node: NodeID,
    pub name: Cow<'static, str>,
    pub detail: Value,
}
