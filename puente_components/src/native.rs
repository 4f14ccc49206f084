use std::any::Any;

use anyhow::Result;
use puente_core::{Behavior, Context, HOST_METADATA_KEY, Node, Scene, SharedProxyRecord};
use puente_host::{HostCommand, HostEvent};
use puente_ids::{BehaviorID, NodeID, SubscriptionID};
use serde_json::{Map as JsonMap, Value, json};
use smallvec::SmallVec;

use crate::catalog::{self, ComponentType};
use crate::config::{ComponentConfig, ConfigOverlay};

/// Bridges one native component onto a scene node. The host-side object
/// lives on the node itself when the node is drawable, otherwise on a proxy
/// placeholder owned either by this bridge alone or shared with sibling
/// bridges through the scene's proxy table.
pub struct NativeComponent {
    type_name: String,
    /// JSON-serializable component payload, pushed to the host on change.
    pub data: JsonMap<String, Value>,
    pub config: ComponentConfig,
    /// Scratch space for catalog hooks (container count/state and the like).
    pub hook_state: JsonMap<String, Value>,

    ty: Option<&'static ComponentType>,
    node: NodeID,
    target: NodeID,
    placeholder: NodeID,
    /// Lineage root for auto-attached children and data inheritance.
    parent: BehaviorID,
    registered: bool,
    last_sent: Option<String>,
    subscriptions: SmallVec<[SubscriptionID; 4]>,
}

impl NativeComponent {
    /// Caller data is merged field-by-field over the type's data defaults;
    /// config merges global defaults, type defaults, then caller overrides.
    pub fn new(type_name: impl Into<String>, data: Value, overrides: ConfigOverlay) -> Self {
        let type_name = type_name.into();
        let ty = catalog::lookup(&type_name);

        let mut merged = ty.map(|t| t.data_defaults.clone()).unwrap_or_default();
        if let Value::Object(caller) = data {
            for (key, value) in caller {
                merged.insert(key, value);
            }
        }

        let type_defaults = ty.map(|t| t.config_defaults).unwrap_or_default();
        let config = ComponentConfig::merged(&type_defaults, &overrides);

        Self {
            type_name,
            data: merged,
            config,
            hook_state: JsonMap::new(),
            ty,
            node: NodeID::nil(),
            target: NodeID::nil(),
            placeholder: NodeID::nil(),
            parent: BehaviorID::nil(),
            registered: false,
            last_sent: None,
            subscriptions: SmallVec::new(),
        }
    }

    pub fn with_defaults(type_name: impl Into<String>) -> Self {
        Self::new(type_name, Value::Null, ConfigOverlay::none())
    }

    pub fn owner(&self) -> NodeID {
        self.node
    }

    /// The node carrying the host-side component: the owner itself when
    /// drawable, otherwise the resolved placeholder.
    pub fn target(&self) -> NodeID {
        self.target
    }

    pub fn placeholder_node(&self) -> NodeID {
        self.placeholder
    }

    pub fn parent_bridge(&self) -> BehaviorID {
        self.parent
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Record a host-event subscription opened on this bridge's behalf; all
    /// tracked handles are cancelled synchronously on dispose.
    pub fn track_subscription(&mut self, subscription: SubscriptionID) {
        self.subscriptions.push(subscription);
    }

    fn resolve_proxy(&mut self, ctx: &mut Context) {
        // Cannot have multiple components of the same type per host object;
        // a second same-type bridge falls back to a standalone placeholder.
        if self.config.shared_component {
            if let Some(record) = ctx.scene.shared_proxies.get(self.node) {
                let conflict = record.behaviors.iter().any(|&other| {
                    other != ctx.behavior
                        && ctx.scene.behaviors.type_name(other) == Some(self.type_name.as_str())
                });
                if conflict {
                    self.config.shared_component = false;
                }
            }
        }

        if self.config.shared_component {
            if !ctx.scene.shared_proxies.contains(self.node) {
                let placeholder = ctx.scene.add_node(Node::proxy(), self.node);
                ctx.scene.shared_proxies.insert(
                    self.node,
                    SharedProxyRecord {
                        placeholder,
                        behaviors: Vec::new(),
                    },
                );
            }
            if let Some(record) = ctx.scene.shared_proxies.get_mut(self.node) {
                record.behaviors.push(ctx.behavior);
                self.placeholder = record.placeholder;
            }
        } else {
            self.placeholder = ctx.scene.add_node(Node::proxy(), self.node);
        }
        self.target = self.placeholder;
    }

    fn link_inherited_parent(&mut self, ctx: &mut Context) {
        let mut ancestor = ctx
            .scene
            .nodes
            .get(self.node)
            .map(|n| n.parent)
            .unwrap_or_default();
        while !ancestor.is_nil() {
            if let Some(bridge) = ctx.scene.behavior_of_type(ancestor, &self.type_name) {
                // Chains always flatten to the root of the lineage.
                let root = bridge_parent(ctx.scene, bridge)
                    .filter(|p| !p.is_nil())
                    .unwrap_or(bridge);
                self.parent = root;
                break;
            }
            ancestor = ctx
                .scene
                .nodes
                .get(ancestor)
                .map(|n| n.parent)
                .unwrap_or_default();
        }
    }

    /// Attach missing same-type bridges to qualifying descendants. Only
    /// lineage roots do this, so fan-out stays one level deep regardless of
    /// tree depth.
    fn propagate(&self, ctx: &mut Context) {
        for descendant in ctx.scene.subtree(self.node) {
            if descendant == self.node {
                continue;
            }
            let Some(node) = ctx.scene.nodes.get(descendant) else {
                continue;
            };
            if node.placeholder {
                continue;
            }
            if !(self.config.recursive || (self.config.recursive_mesh && node.drawable)) {
                continue;
            }
            if ctx
                .scene
                .behavior_of_type(descendant, &self.type_name)
                .is_some()
            {
                continue;
            }

            let mut child = NativeComponent::new(
                self.type_name.clone(),
                Value::Object(self.data.clone()),
                ConfigOverlay::from(&self.config),
            );
            child.parent = ctx.behavior;
            ctx.scene.attach_behavior(descendant, Box::new(child));
        }
    }

    fn child_bridges(&self, ctx: &Context) -> Vec<BehaviorID> {
        let mut out = Vec::new();
        for descendant in ctx.scene.subtree(self.node) {
            if descendant == self.node {
                continue;
            }
            if let Some(bridge) = ctx.scene.behavior_of_type(descendant, &self.type_name) {
                if bridge_parent(ctx.scene, bridge) == Some(ctx.behavior) {
                    out.push(bridge);
                }
            }
        }
        out
    }

    fn is_lineage_root(&self) -> bool {
        self.parent.is_nil() && (self.config.recursive || self.config.recursive_mesh)
    }

    fn run_update(&mut self, ctx: &mut Context) -> Result<()> {
        // Placeholder inherits the owner's visibility and host metadata.
        if !self.placeholder.is_nil() {
            let mirrored = ctx.scene.nodes.get(self.node).map(|owner| {
                (
                    owner.visible,
                    owner.user_data.get(HOST_METADATA_KEY).cloned(),
                )
            });
            if let Some((visible, host_meta)) = mirrored {
                if let Some(placeholder) = ctx.scene.nodes.get_mut(self.placeholder) {
                    placeholder.visible = visible;
                    if let Some(meta) = host_meta {
                        placeholder.user_data.insert(HOST_METADATA_KEY.to_string(), meta);
                    }
                }
            }
        }

        // Children never own data; they resolve the lineage root's each tick.
        if self.config.inherit_parent_data && !self.parent.is_nil() {
            if let Some(data) = bridge_data(ctx.scene, self.parent) {
                self.data = data;
            }
        }

        // Re-scan for descendants added after awake.
        if self.is_lineage_root() {
            self.propagate(ctx);
        }

        if !ctx.scene.host.is_connected() {
            return Ok(());
        }

        if !self.registered && self.eligible(ctx) {
            self.registered = true;
            ctx.scene.host.submit(HostCommand::AddComponent {
                node: self.target,
                component: self.type_name.clone(),
            });
        }

        if self.config.send_updates {
            if self.config.update_on_stale_data {
                let snapshot = serde_json::to_string(&self.data)?;
                if self.last_sent.as_deref() != Some(snapshot.as_str()) {
                    self.push_data(ctx)?;
                    self.last_sent = Some(snapshot);
                }
            } else {
                self.push_data(ctx)?;
            }
        }
        Ok(())
    }

    /// Host registration happens exactly once, the first time the bridge
    /// becomes eligible. Types restricted to drawable targets become
    /// eligible through a shared proxy as soon as any sibling on the record
    /// already registered.
    fn eligible(&self, ctx: &Context) -> bool {
        let owner_drawable = ctx
            .scene
            .nodes
            .get(self.node)
            .map(|n| n.drawable)
            .unwrap_or(false);
        if !self.config.mesh_component || owner_drawable {
            return true;
        }
        if self.config.shared_component {
            if let Some(record) = ctx.scene.shared_proxies.get(self.node) {
                return record
                    .behaviors
                    .iter()
                    .any(|&other| other != ctx.behavior && bridge_registered(ctx.scene, other));
            }
        }
        false
    }

    fn push_data(&mut self, ctx: &mut Context) -> Result<()> {
        if let Some(hook) = self.ty.and_then(|t| t.on_update) {
            return hook(self, ctx);
        }
        if self.registered {
            ctx.scene.host.submit(HostCommand::UpdateComponent {
                node: self.target,
                component: self.type_name.clone(),
                data: Value::Object(self.data.clone()),
            });
        }
        Ok(())
    }

    /// Forward an invocation to the host proxy, the type's invocation hook,
    /// and (for lineage roots) every auto-attached child bridge.
    pub fn call_component(&mut self, ctx: &mut Context, function: &str, args: &[Value]) -> Result<()> {
        if self.registered {
            ctx.scene.host.submit(HostCommand::CallComponent {
                node: self.target,
                component: self.type_name.clone(),
                function: function.to_string(),
                args: args.to_vec(),
            });
        }
        if let Some(hook) = self.ty.and_then(|t| t.on_invoke) {
            hook(self, ctx, function, args)?;
        }

        if self.is_lineage_root() {
            for child in self.child_bridges(ctx) {
                ctx.with_behavior(child, |behavior, ctx| {
                    if let Some(bridge) = behavior.as_any_mut().downcast_mut::<NativeComponent>() {
                        if let Err(err) = bridge.call_component(ctx, function, args) {
                            log::warn!("forwarded invocation '{function}' failed: {err:#}");
                        }
                    }
                });
            }
        }
        Ok(())
    }
}

impl Behavior for NativeComponent {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn awake(&mut self, ctx: &mut Context) -> Result<()> {
        self.node = ctx.node;
        self.target = self.node;
        self.registered = false;
        ctx.mark_managed();

        let drawable = ctx
            .scene
            .nodes
            .get(self.node)
            .map(|n| n.drawable)
            .unwrap_or(false);
        if !drawable {
            self.resolve_proxy(ctx);
        }

        if let Some(hook) = self.ty.and_then(|t| t.on_init) {
            hook(self, ctx)?;
        }

        // Host-default colliders are opt-in per type.
        if !self.config.use_collider {
            disable_collider(ctx.scene, self.target);
        }

        if self.config.inherit_parent_data && self.parent.is_nil() {
            self.link_inherited_parent(ctx);
        }

        self.run_update(ctx)?;

        if self.parent.is_nil() && (self.config.recursive || self.config.recursive_mesh) {
            self.propagate(ctx);
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context) -> Result<()> {
        self.run_update(ctx)
    }

    fn dispose(&mut self, ctx: &mut Context) -> Result<()> {
        if self.is_lineage_root() {
            for child in self.child_bridges(ctx) {
                ctx.scene.remove_behavior(child);
            }
        }

        // Synchronous, so no event delivered later can reach this bridge.
        for subscription in std::mem::take(&mut self.subscriptions) {
            ctx.scene.events.cancel(subscription);
        }

        if self.registered {
            ctx.scene.host.submit(HostCommand::RemoveComponent {
                node: self.target,
                component: self.type_name.clone(),
            });
            self.registered = false;
        }

        if self.config.shared_component {
            let emptied = {
                let record = ctx.scene.shared_proxies.get_mut(self.node);
                match record {
                    Some(record) => {
                        record.behaviors.retain(|&b| b != ctx.behavior);
                        record.behaviors.is_empty()
                    }
                    None => false,
                }
            };
            if emptied {
                if let Some(record) = ctx.scene.shared_proxies.remove(self.node) {
                    ctx.scene.destroy_node(record.placeholder);
                }
            }
        } else if !self.placeholder.is_nil() {
            ctx.scene.destroy_node(self.placeholder);
        }

        self.node = NodeID::nil();
        self.target = NodeID::nil();
        self.placeholder = NodeID::nil();
        self.parent = BehaviorID::nil();
        self.last_sent = None;
        self.hook_state.clear();
        Ok(())
    }

    fn on_host_event(&mut self, ctx: &mut Context, event: &HostEvent) -> Result<()> {
        if let Some(hook) = self.ty.and_then(|t| t.on_event) {
            hook(self, ctx, event)?;
        }
        Ok(())
    }

    fn clone_behavior(&self) -> Option<Box<dyn Behavior>> {
        Some(Box::new(NativeComponent::new(
            self.type_name.clone(),
            Value::Object(self.data.clone()),
            ConfigOverlay::from(&self.config),
        )))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Invoke a component function on a bridge by id. No-op (returning false)
/// when the id is dead or not a bridge.
pub fn invoke(scene: &mut Scene, bridge: BehaviorID, function: &str, args: &[Value]) -> bool {
    scene
        .with_behavior(bridge, |behavior, ctx| {
            match behavior.as_any_mut().downcast_mut::<NativeComponent>() {
                Some(component) => {
                    if let Err(err) = component.call_component(ctx, function, args) {
                        log::warn!("component invocation '{function}' failed: {err:#}");
                    }
                    true
                }
                None => false,
            }
        })
        .unwrap_or(false)
}

fn bridge_parent(scene: &Scene, bridge: BehaviorID) -> Option<BehaviorID> {
    scene
        .behaviors
        .get(bridge)?
        .behavior()?
        .as_any()
        .downcast_ref::<NativeComponent>()
        .map(|b| b.parent)
}

fn bridge_data(scene: &Scene, bridge: BehaviorID) -> Option<JsonMap<String, Value>> {
    scene
        .behaviors
        .get(bridge)?
        .behavior()?
        .as_any()
        .downcast_ref::<NativeComponent>()
        .map(|b| b.data.clone())
}

fn bridge_registered(scene: &Scene, bridge: BehaviorID) -> bool {
    scene
        .behaviors
        .get(bridge)
        .and_then(|slot| slot.behavior())
        .and_then(|b| b.as_any().downcast_ref::<NativeComponent>())
        .map(|b| b.registered)
        .unwrap_or(false)
}

fn disable_collider(scene: &mut Scene, target: NodeID) {
    let Some(node) = scene.nodes.get_mut(target) else {
        return;
    };
    let meta = node
        .user_data
        .entry(HOST_METADATA_KEY.to_string())
        .or_insert_with(|| json!({}));
    if !meta.is_object() {
        *meta = json!({});
    }
    if let Some(meta) = meta.as_object_mut() {
        let collider = meta
            .entry("collider".to_string())
            .or_insert_with(|| json!({}));
        if !collider.is_object() {
            *collider = json!({});
        }
        if let Some(collider) = collider.as_object_mut() {
            collider.insert("enabled".to_string(), json!(false));
        }
    }
}
