use ahash::AHashMap;
use puente_ids::{BehaviorID, NodeID};

/// A proxy placeholder shared by every shareable bridge on one node. The
/// behavior list doubles as the reference count: the record (and its
/// placeholder node) goes away when the list empties. One record per node —
/// components of different types multiplex the same placeholder.
#[derive(Debug, Clone)]
pub struct SharedProxyRecord {
    pub placeholder: NodeID,
    pub behaviors: Vec<BehaviorID>,
}

/// Owned side table `node → SharedProxyRecord`, mutated only by bridge
/// awake/dispose, which run strictly sequentially.
pub struct SharedProxyTable {
    records: AHashMap<NodeID, SharedProxyRecord>,
}

impl SharedProxyTable {
    pub fn new() -> Self {
        Self {
            records: AHashMap::default(),
        }
    }

    pub fn get(&self, node: NodeID) -> Option<&SharedProxyRecord> {
        self.records.get(&node)
    }

    pub fn get_mut(&mut self, node: NodeID) -> Option<&mut SharedProxyRecord> {
        self.records.get_mut(&node)
    }

    pub fn insert(&mut self, node: NodeID, record: SharedProxyRecord) {
        self.records.insert(node, record);
    }

    pub fn remove(&mut self, node: NodeID) -> Option<SharedProxyRecord> {
        self.records.remove(&node)
    }

    pub fn contains(&self, node: NodeID) -> bool {
        self.records.contains_key(&node)
    }

    /// Drop one behavior reference from the node's record, if any. Also used
    /// as a backstop when a behavior is purged without a clean dispose.
    pub fn release(&mut self, node: NodeID, behavior: BehaviorID) {
        if let Some(record) = self.records.get_mut(&node) {
            record.behaviors.retain(|&b| b != behavior);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for SharedProxyTable {
    fn default() -> Self {
        Self::new()
    }
}
