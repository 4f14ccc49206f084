use puente_host::HostBridge;
use puente_ids::{BehaviorID, NodeID, SubscriptionID};

use crate::behavior::{Behavior, BehaviorArena};
use crate::events::{EventRouter, NodeEvent};
use crate::node::Node;
use crate::node_arena::NodeArena;
use crate::proxy::SharedProxyTable;

pub struct Timing {
    pub delta_ms: f32,
    pub elapsed_ms: f32,
}

/// The scene: node arena, behavior arena, shared-proxy side table, host
/// bridge and event routing, plus the per-tick driver.
///
/// Single-threaded cooperative model: one external tick drives everything,
/// host and store notifications are drained queues. Behavior calls go through
/// take-call-putback on the arena slot so a behavior can freely mutate the
/// rest of the scene while it runs.
pub struct Scene {
    pub nodes: NodeArena,
    pub behaviors: BehaviorArena,
    pub shared_proxies: SharedProxyTable,
    pub events: EventRouter,
    pub host: Box<dyn HostBridge>,
    pub time: Timing,

    root: NodeID,
    /// Scene-wide attachment order; updates run in this order.
    order: Vec<BehaviorID>,
    node_events: Vec<NodeEvent>,
    schedule: Vec<BehaviorID>,
}

impl Scene {
    pub fn new(host: Box<dyn HostBridge>) -> Self {
        let mut nodes = NodeArena::new();
        let root = nodes.insert(Node::new("Root"));
        Self {
            nodes,
            behaviors: BehaviorArena::new(),
            shared_proxies: SharedProxyTable::new(),
            events: EventRouter::new(),
            host,
            time: Timing {
                delta_ms: 0.0,
                elapsed_ms: 0.0,
            },
            root,
            order: Vec::new(),
            node_events: Vec::new(),
            schedule: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeID {
        self.root
    }

    // ---- tree ----

    /// Insert a node and link it under `parent` (pass nil to leave it
    /// detached). Returns the issued id.
    pub fn add_node(&mut self, node: Node, parent: NodeID) -> NodeID {
        let id = self.nodes.insert(node);
        if self.nodes.contains(parent) {
            self.link(parent, id);
        }
        id
    }

    fn link(&mut self, parent: NodeID, child: NodeID) {
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = parent;
        }
    }

    /// Re-insert a detached node under `parent`. A node that is still linked
    /// somewhere is detached first (which runs managed teardown).
    pub fn attach(&mut self, node: NodeID, parent: NodeID) -> bool {
        if !self.nodes.contains(node) || !self.nodes.contains(parent) || node == parent {
            return false;
        }
        self.detach(node);
        self.link(parent, node);
        true
    }

    /// Unlink a node (and implicitly its subtree) from the live tree. If the
    /// node has a managed-behavior observer installed, the observer walks the
    /// subtree, disposes every awake managed behavior, then uninstalls
    /// itself. Removal from the tree is distinct from destruction: nodes and
    /// behaviors stay allocated and can be re-attached.
    pub fn detach(&mut self, node: NodeID) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        let parent = n.parent;
        if parent.is_nil() {
            return;
        }

        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|&c| c != node);
        }
        if let Some(n) = self.nodes.get_mut(node) {
            n.parent = NodeID::nil();
        }

        let observer_installed = self
            .nodes
            .get(node)
            .map(|n| n.managed_observer)
            .unwrap_or(false);
        if observer_installed {
            // Observer is one-shot; reinstalled by the next managed registration.
            if let Some(n) = self.nodes.get_mut(node) {
                n.managed_observer = false;
            }
            self.managed_teardown(node);
        }
    }

    /// Destroy a node and its whole subtree: dispose and remove every
    /// behavior, drop shared-proxy records, free the nodes.
    pub fn destroy_node(&mut self, node: NodeID) {
        if !self.nodes.contains(node) {
            return;
        }
        self.detach(node);

        for id in self.subtree(node) {
            let behavior_ids: Vec<BehaviorID> = self
                .nodes
                .get(id)
                .map(|n| n.behaviors.to_vec())
                .unwrap_or_default();
            for behavior in behavior_ids {
                self.remove_behavior(behavior);
            }
        }

        // Re-collect: bridge disposal may already have destroyed proxy children.
        for id in self.subtree(node) {
            self.shared_proxies.remove(id);
            self.nodes.remove(id);
        }
    }

    /// Preorder subtree ids, including `node` itself.
    pub fn subtree(&self, node: NodeID) -> Vec<NodeID> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(n) = self.nodes.get(id) else {
                continue;
            };
            out.push(id);
            for &child in n.children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Whether the node is reachable from the scene root.
    pub fn in_live_tree(&self, node: NodeID) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            let Some(n) = self.nodes.get(current) else {
                return false;
            };
            if n.parent.is_nil() {
                return false;
            }
            current = n.parent;
        }
    }

    // ---- behaviors ----

    /// Attach a behavior to a node. It awakes on the next tick once the node
    /// is part of the live tree.
    pub fn attach_behavior(&mut self, node: NodeID, behavior: Box<dyn Behavior>) -> BehaviorID {
        let id = self.behaviors.insert(node, behavior);
        if let Some(n) = self.nodes.get_mut(node) {
            n.behaviors.push(id);
        }
        self.order.push(id);
        id
    }

    /// Dispose (if awake) and permanently remove a behavior. Safe to call
    /// from inside the behavior's own update — removal is then deferred until
    /// the call returns.
    pub fn remove_behavior(&mut self, id: BehaviorID) {
        let Some(slot) = self.behaviors.get_mut(id) else {
            return;
        };
        if slot.behavior.is_none() {
            // Currently executing; finalized when its call returns.
            slot.pending_removal = true;
            return;
        }

        let was_awake = slot.awake;
        slot.awake = false;
        if was_awake {
            if let Some(Err(err)) = self.with_behavior(id, |b, ctx| b.dispose(ctx)) {
                self.log_lifecycle_error("dispose", id, &err);
            }
        }
        self.purge_behavior(id);
    }

    /// First behavior of the given type on a node, in attachment order.
    pub fn behavior_of_type(&self, node: NodeID, type_name: &str) -> Option<BehaviorID> {
        let n = self.nodes.get(node)?;
        n.behaviors
            .iter()
            .copied()
            .find(|&b| self.behaviors.type_name(b) == Some(type_name))
    }

    /// Flag a behavior as managed: it is disposed automatically when its
    /// owning node leaves the live tree and re-awoken on re-entry, without
    /// ever leaving the node's behavior list.
    pub fn manage_behavior(&mut self, id: BehaviorID) {
        let Some(slot) = self.behaviors.get_mut(id) else {
            return;
        };
        slot.managed = true;
        let node = slot.node;
        if let Some(n) = self.nodes.get_mut(node) {
            n.managed_observer = true;
        }
    }

    /// Revert to manual lifecycle; the behavior must then be removed with
    /// `remove_behavior` when no longer needed.
    pub fn unmanage_behavior(&mut self, id: BehaviorID) {
        if let Some(slot) = self.behaviors.get_mut(id) {
            slot.managed = false;
        }
    }

    fn managed_teardown(&mut self, root: NodeID) {
        for node in self.subtree(root) {
            let behavior_ids: Vec<BehaviorID> = self
                .nodes
                .get(node)
                .map(|n| n.behaviors.to_vec())
                .unwrap_or_default();
            for id in behavior_ids {
                let Some(slot) = self.behaviors.get_mut(id) else {
                    continue;
                };
                if !slot.awake || !slot.managed {
                    continue;
                }
                slot.awake = false;
                if let Some(Err(err)) = self.with_behavior(id, |b, ctx| b.dispose(ctx)) {
                    self.log_lifecycle_error("managed dispose", id, &err);
                }
            }
        }
    }

    // ---- tick ----

    /// One host tick: route pending host events, then awake/update behaviors
    /// in attachment order. Lifecycle errors are logged and contained.
    pub fn update(&mut self, delta_ms: f32) {
        self.time.delta_ms = delta_ms;
        self.time.elapsed_ms += delta_ms;

        self.pump_host_events();

        // Snapshot the schedule so behaviors attached mid-tick run next tick.
        self.schedule.clear();
        self.schedule.extend(self.order.iter().copied());
        let schedule = std::mem::take(&mut self.schedule);

        for &id in &schedule {
            let Some(slot) = self.behaviors.get(id) else {
                continue;
            };
            if slot.behavior.is_none() {
                continue;
            }
            let node = slot.node;
            if !self.in_live_tree(node) {
                continue;
            }

            if !slot.awake {
                if let Some(slot) = self.behaviors.get_mut(id) {
                    slot.awake = true;
                }
                if let Some(Err(err)) = self.with_behavior(id, |b, ctx| b.awake(ctx)) {
                    self.log_lifecycle_error("awake", id, &err);
                }
                // First driver update comes next tick; awake runs its own
                // initial pass where one is needed.
                continue;
            }

            // Teardown earlier in this tick may have put it back to sleep.
            if !self.behaviors.is_awake(id) {
                continue;
            }
            if let Some(Err(err)) = self.with_behavior(id, |b, ctx| b.update(ctx)) {
                self.log_lifecycle_error("update", id, &err);
            }
        }

        self.schedule = schedule;
    }

    fn pump_host_events(&mut self) {
        let mut events = Vec::new();
        self.host.drain_events(&mut events);
        for event in &events {
            for behavior in self.events.subscribers(event.name()) {
                if let Some(Err(err)) =
                    self.with_behavior(behavior, |b, ctx| b.on_host_event(ctx, event))
                {
                    self.log_lifecycle_error("host event handler", behavior, &err);
                }
            }
        }
    }

    /// Take-call-putback on one behavior slot. Returns `None` if the slot is
    /// gone or the behavior is already taken (a behavior never re-enters
    /// itself). If the behavior was flagged for removal while running, it is
    /// disposed and purged here instead of being put back.
    pub fn with_behavior<R>(
        &mut self,
        id: BehaviorID,
        f: impl FnOnce(&mut dyn Behavior, &mut Context) -> R,
    ) -> Option<R> {
        let slot = self.behaviors.get_mut(id)?;
        let mut taken = slot.behavior.take()?;
        let node = slot.node;
        let delta_ms = self.time.delta_ms;

        let result = {
            let mut ctx = Context {
                scene: self,
                node,
                behavior: id,
                delta_ms,
            };
            f(taken.as_mut(), &mut ctx)
        };

        let mut taken = Some(taken);
        if let Some(slot) = self.behaviors.get_mut(id) {
            if !slot.pending_removal {
                slot.behavior = taken.take();
            }
        }
        if let Some(leftover) = taken {
            self.finalize_removal(id, node, leftover);
        }
        Some(result)
    }

    fn finalize_removal(&mut self, id: BehaviorID, node: NodeID, mut behavior: Box<dyn Behavior>) {
        let was_awake = self.behaviors.is_awake(id);
        if was_awake {
            let delta_ms = self.time.delta_ms;
            let mut ctx = Context {
                scene: self,
                node,
                behavior: id,
                delta_ms,
            };
            if let Err(err) = behavior.dispose(&mut ctx) {
                self.log_lifecycle_error("dispose", id, &err);
            }
        }
        self.purge_behavior(id);
    }

    fn purge_behavior(&mut self, id: BehaviorID) {
        self.events.cancel_all_for(id);
        self.order.retain(|&b| b != id);
        if let Some(slot) = self.behaviors.remove(id) {
            if let Some(n) = self.nodes.get_mut(slot.node) {
                n.behaviors.retain(|b| *b != id);
            }
            self.shared_proxies.release(slot.node, id);
        }
    }

    fn log_lifecycle_error(&self, phase: &str, id: BehaviorID, err: &anyhow::Error) {
        let type_name = self.behaviors.type_name(id).unwrap_or("<gone>");
        let node = self.behaviors.node_of(id).unwrap_or_default();
        let node_name = self
            .nodes
            .get(node)
            .map(|n| n.name.as_ref())
            .unwrap_or("<gone>");
        log::error!("{phase} failed for behavior '{type_name}' on node '{node_name}' ({node}): {err:#}");
    }

    // ---- node events ----

    /// Queue an event on a node for the application to observe.
    pub fn emit_node_event(&mut self, event: NodeEvent) {
        self.node_events.push(event);
    }

    pub fn take_node_events(&mut self) -> Vec<NodeEvent> {
        std::mem::take(&mut self.node_events)
    }

    // ---- cloning ----

    /// Clone a node (fresh id, detached) together with every behavior on it
    /// that implements the clone capability; recursion clones children the
    /// same way. Proxy placeholders are skipped — cloned bridges create
    /// their own on awake.
    pub fn clone_with_behaviors(&mut self, node: NodeID, recursive: bool) -> Option<NodeID> {
        let src = self.nodes.get(node)?;
        if src.placeholder {
            return None;
        }

        let copy = Node {
            id: NodeID::nil(),
            name: src.name.clone(),
            parent: NodeID::nil(),
            children: Vec::new(),
            behaviors: Default::default(),
            visible: src.visible,
            drawable: src.drawable,
            user_data: src.user_data.clone(),
            placeholder: false,
            managed_observer: false,
        };
        let behavior_ids: Vec<BehaviorID> = src.behaviors.to_vec();
        let child_ids: Vec<NodeID> = src.children.clone();

        let copy_id = self.nodes.insert(copy);

        for id in behavior_ids {
            let cloned = self
                .behaviors
                .get(id)
                .and_then(|slot| slot.behavior())
                .and_then(|b| b.clone_behavior());
            if let Some(behavior) = cloned {
                self.attach_behavior(copy_id, behavior);
            }
        }

        if recursive {
            for child in child_ids {
                if let Some(child_copy) = self.clone_with_behaviors(child, true) {
                    self.link(copy_id, child_copy);
                }
            }
        }

        Some(copy_id)
    }
}

/// Everything a behavior sees while it runs: the scene (minus the behavior
/// itself, which is taken out of its slot), its owner node, its own id, and
/// the tick delta.
pub struct Context<'a> {
    pub scene: &'a mut Scene,
    pub node: NodeID,
    pub behavior: BehaviorID,
    pub delta_ms: f32,
}

impl Context<'_> {
    /// Flag the current behavior as managed: disposed on tree removal,
    /// re-awoken on re-entry.
    pub fn mark_managed(&mut self) {
        self.scene.manage_behavior(self.behavior);
    }

    /// Subscribe the current behavior to a named host event. The handle must
    /// be cancelled by dispose at the latest.
    pub fn subscribe(&mut self, event: &'static str) -> SubscriptionID {
        self.scene.events.subscribe(event, self.behavior)
    }

    pub fn cancel(&mut self, subscription: SubscriptionID) {
        self.scene.events.cancel(subscription);
    }

    /// Run a call against another behavior (take-call-putback). Returns
    /// `None` for dead ids and for the currently running behavior.
    pub fn with_behavior<R>(
        &mut self,
        id: BehaviorID,
        f: impl FnOnce(&mut dyn Behavior, &mut Context) -> R,
    ) -> Option<R> {
        self.scene.with_behavior(id, f)
    }
}
