use ahash::AHashMap;
use puente_ids::SubscriptionID;
use serde_json::Value;

/// External ownership-tracked real-time store, addressed by hierarchical
/// path. Notifications are queued per subscription and drained by the
/// subscriber on its own tick — never delivered as callbacks.
pub trait RemoteStore {
    fn set(&mut self, path: &str, value: Value);

    /// Subscribe to value changes at `path`.
    fn on_value(&mut self, path: &str) -> SubscriptionID;

    fn off_value(&mut self, path: &str, subscription: SubscriptionID);

    /// Move pending change notifications for `subscription` into `out`.
    fn take_changes(&mut self, subscription: SubscriptionID, out: &mut Vec<Value>);

    /// Whether the local party currently owns the object at `path`.
    fn is_owner(&self, path: &str) -> bool;
}

struct ValueSubscription {
    path: String,
    pending: Vec<Value>,
}

/// In-memory store: a local stand-in for the real-time backend, also used
/// to simulate remote parties in tests (write with ownership flipped off).
pub struct MemoryStore {
    values: AHashMap<String, Value>,
    subscriptions: AHashMap<SubscriptionID, ValueSubscription>,
    owned: AHashMap<String, bool>,
    next_id: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            values: AHashMap::default(),
            subscriptions: AHashMap::default(),
            owned: AHashMap::default(),
            next_id: 0,
        }
    }

    pub fn value(&self, path: &str) -> Option<&Value> {
        self.values.get(path)
    }

    /// Claim or release local ownership of a path.
    pub fn set_owner(&mut self, path: &str, owned: bool) {
        self.owned.insert(path.to_string(), owned);
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for MemoryStore {
    fn set(&mut self, path: &str, value: Value) {
        self.values.insert(path.to_string(), value.clone());
        for subscription in self.subscriptions.values_mut() {
            if subscription.path == path {
                subscription.pending.push(value.clone());
            }
        }
    }

    fn on_value(&mut self, path: &str) -> SubscriptionID {
        self.next_id += 1;
        let id = SubscriptionID::from_parts(self.next_id, 0);
        self.subscriptions.insert(
            id,
            ValueSubscription {
                path: path.to_string(),
                pending: Vec::new(),
            },
        );
        id
    }

    fn off_value(&mut self, _path: &str, subscription: SubscriptionID) {
        self.subscriptions.remove(&subscription);
    }

    fn take_changes(&mut self, subscription: SubscriptionID, out: &mut Vec<Value>) {
        if let Some(subscription) = self.subscriptions.get_mut(&subscription) {
            out.append(&mut subscription.pending);
        }
    }

    fn is_owner(&self, path: &str) -> bool {
        self.owned.get(path).copied().unwrap_or(false)
    }
}
