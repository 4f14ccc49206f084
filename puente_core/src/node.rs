use std::borrow::Cow;

use puente_ids::{BehaviorID, NodeID};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use smallvec::SmallVec;

/// Key in `user_data` under which host scene-integration metadata lives
/// (collider participation, grab settings, and whatever else the host reads).
pub const HOST_METADATA_KEY: &str = "host";

/// A scene-graph element. Owns its behavior list; parent/children are arena
/// indices, never references. Runtime links are skipped on serialization and
/// rebuilt by whoever loads the scene.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Node {
    #[serde(skip)]
    pub id: NodeID,

    pub name: Cow<'static, str>,

    #[serde(skip)]
    pub parent: NodeID,

    #[serde(skip)]
    pub children: Vec<NodeID>,

    #[serde(skip)]
    pub behaviors: SmallVec<[BehaviorID; 4]>,

    pub visible: bool,

    /// Whether the node can carry a host representation itself. Nodes that
    /// cannot get a placeholder proxy when a component is bridged onto them.
    pub drawable: bool,

    /// Opaque application bag. The `"host"` entry is mirrored onto proxy
    /// placeholders each tick.
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub user_data: JsonMap<String, Value>,

    /// Created as a bridge proxy; excluded from recursive component
    /// propagation and subtree cloning.
    #[serde(skip)]
    pub placeholder: bool,

    #[serde(skip)]
    pub(crate) managed_observer: bool,
}

impl Node {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: NodeID::nil(),
            name: name.into(),
            parent: NodeID::nil(),
            children: Vec::new(),
            behaviors: SmallVec::new(),
            visible: true,
            drawable: false,
            user_data: JsonMap::new(),
            placeholder: false,
            managed_observer: false,
        }
    }

    /// A node with its own host representation (a mesh, in host terms).
    pub fn drawable(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            drawable: true,
            ..Self::new(name)
        }
    }

    /// Tiny invisible drawable used to carry a component on behalf of a node
    /// that cannot host one itself.
    pub fn proxy() -> Self {
        Self {
            visible: false,
            drawable: true,
            placeholder: true,
            ..Self::new("proxy")
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new("Node")
    }
}
