//! Static component type catalog: data/config defaults plus optional hooks,
//! resolved once at bridge construction. Unknown type names simply yield no
//! defaults.

use std::borrow::Cow;
use std::collections::HashMap;

use anyhow::Result;
use once_cell::sync::Lazy;
use puente_core::{Context, NodeEvent};
use puente_host::{CollisionPhase, HostEvent};
use serde_json::{Map as JsonMap, Value, json};

use crate::config::ConfigOverlay;
use crate::native::NativeComponent;

pub type InitHook = fn(&mut NativeComponent, &mut Context) -> Result<()>;
pub type UpdateHook = fn(&mut NativeComponent, &mut Context) -> Result<()>;
pub type InvokeHook = fn(&mut NativeComponent, &mut Context, &str, &[Value]) -> Result<()>;
pub type EventHook = fn(&mut NativeComponent, &mut Context, &HostEvent) -> Result<()>;

/// One catalog entry. Hooks are plain `fn` pointers in a fixed capability
/// set; a bridge resolves its entry once and never goes back to the table.
#[derive(Default)]
pub struct ComponentType {
    pub data_defaults: JsonMap<String, Value>,
    pub config_defaults: ConfigOverlay,
    pub on_init: Option<InitHook>,
    pub on_update: Option<UpdateHook>,
    pub on_invoke: Option<InvokeHook>,
    pub on_event: Option<EventHook>,
}

pub fn lookup(name: &str) -> Option<&'static ComponentType> {
    CATALOG.get(name)
}

fn data(value: Value) -> JsonMap<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => JsonMap::new(),
    }
}

static CATALOG: Lazy<HashMap<&'static str, ComponentType>> = Lazy::new(|| {
    let collider_config = ConfigOverlay {
        mesh_component: Some(true),
        ..ConfigOverlay::none()
    };

    let mut types = HashMap::new();

    types.insert(
        "n-object",
        ComponentType {
            data_defaults: data(json!({ "res": "architecture/wall-4w-4h" })),
            ..Default::default()
        },
    );

    types.insert(
        "n-spawner",
        ComponentType {
            data_defaults: data(json!({ "res": "interactables/basketball" })),
            ..Default::default()
        },
    );

    types.insert(
        "n-text",
        ComponentType {
            data_defaults: data(json!({
                "text": "",
                "fontSize": 10,
                "width": 10,
                "height": 1,
                "horizontalAlign": "middle",
                "verticalAlign": "middle"
            })),
            ..Default::default()
        },
    );

    types.insert(
        "n-sphere-collider",
        ComponentType {
            data_defaults: data(json!({
                "isTrigger": false,
                "center": { "x": 0, "y": 0, "z": 0 },
                "radius": 0,
                "type": "environment"
            })),
            config_defaults: collider_config,
            on_init: Some(collider_init),
            on_event: Some(collider_event),
            ..Default::default()
        },
    );

    types.insert(
        "n-box-collider",
        ComponentType {
            data_defaults: data(json!({
                "isTrigger": false,
                "center": { "x": 0, "y": 0, "z": 0 },
                "size": { "x": 0, "y": 0, "z": 0 },
                "type": "environment"
            })),
            config_defaults: collider_config,
            on_init: Some(collider_init),
            on_event: Some(collider_event),
            ..Default::default()
        },
    );

    types.insert(
        "n-capsule-collider",
        ComponentType {
            data_defaults: data(json!({
                "isTrigger": false,
                "center": { "x": 0, "y": 0, "z": 0 },
                "radius": 0,
                "height": 0,
                "direction": "y",
                "type": "environment"
            })),
            config_defaults: collider_config,
            on_init: Some(collider_init),
            on_event: Some(collider_event),
            ..Default::default()
        },
    );

    types.insert(
        "n-mesh-collider",
        ComponentType {
            data_defaults: data(json!({
                "isTrigger": false,
                "convex": true,
                "type": "environment"
            })),
            config_defaults: ConfigOverlay {
                recursive_mesh: Some(true),
                inherit_parent_data: Some(true),
                mesh_component: Some(true),
                ..ConfigOverlay::none()
            },
            on_init: Some(collider_init),
            on_event: Some(collider_event),
            ..Default::default()
        },
    );

    types.insert(
        "n-container",
        ComponentType {
            data_defaults: data(json!({ "capacity": 4 })),
            config_defaults: ConfigOverlay {
                mesh_component: Some(true),
                ..ConfigOverlay::none()
            },
            on_init: Some(container_init),
            on_event: Some(container_event),
            ..Default::default()
        },
    );

    types.insert(
        "n-sound",
        ComponentType {
            data_defaults: data(json!({
                "on": "",
                "res": "",
                "src": "",
                "loop": false,
                "volume": 1,
                "autoplay": false,
                "oneshot": false,
                "spatialBlend": 1,
                "pitch": 1,
                "minDistance": 1,
                "maxDistance": 12
            })),
            on_init: Some(sound_init),
            on_event: Some(sound_event),
            on_invoke: Some(sound_invoke),
            ..Default::default()
        },
    );

    types.insert(
        "n-skeleton-parent",
        ComponentType {
            data_defaults: data(json!({
                "part": "head",
                "side": "center",
                "index": 0,
                "userId": null
            })),
            config_defaults: ConfigOverlay {
                recursive_mesh: Some(true),
                inherit_parent_data: Some(true),
                mesh_component: Some(true),
                ..ConfigOverlay::none()
            },
            ..Default::default()
        },
    );

    types.insert(
        "n-cockpit-parent",
        ComponentType {
            config_defaults: ConfigOverlay {
                send_updates: Some(false),
                recursive_mesh: Some(true),
                inherit_parent_data: Some(true),
                mesh_component: Some(true),
                ..ConfigOverlay::none()
            },
            ..Default::default()
        },
    );

    types.insert(
        "n-billboard",
        ComponentType {
            config_defaults: ConfigOverlay {
                send_updates: Some(false),
                mesh_component: Some(true),
                ..ConfigOverlay::none()
            },
            ..Default::default()
        },
    );

    types.insert(
        "n-layout-browser",
        ComponentType {
            data_defaults: data(json!({ "url": "about:blank", "isEnclosure": false })),
            ..Default::default()
        },
    );

    types.insert(
        "n-portal",
        ComponentType {
            data_defaults: data(json!({
                "targetSpace": null,
                "targetEvent": null,
                "targetPosition": { "x": 0, "y": 0, "z": 0 },
                "targetQuaternion": { "x": 0, "y": 0, "z": 0, "w": 1 }
            })),
            ..Default::default()
        },
    );

    types.insert(
        "n-gltf",
        ComponentType {
            data_defaults: data(json!({ "url": "", "sceneIndex": 0 })),
            ..Default::default()
        },
    );

    types.insert(
        "n-rigidbody",
        ComponentType {
            data_defaults: data(json!({
                "mass": 1,
                "drag": 0,
                "angularDrag": 0.05,
                "useGravity": true,
                "isKinematic": false,
                "positionConstraints": [false, false, false],
                "rotationConstraints": [false, false, false]
            })),
            config_defaults: ConfigOverlay {
                mesh_component: Some(true),
                ..ConfigOverlay::none()
            },
            ..Default::default()
        },
    );

    types
});

// ---- collider hooks ----

/// Collision and trigger notifications arrive against the proxy; re-emit
/// them on the behavior's owner so the application sees the real node.
fn collider_init(bridge: &mut NativeComponent, ctx: &mut Context) -> Result<()> {
    if ctx.scene.host.is_connected() && !bridge.placeholder_node().is_nil() {
        let collision = ctx.subscribe("collision");
        let trigger = ctx.subscribe("trigger");
        bridge.track_subscription(collision);
        bridge.track_subscription(trigger);
    }
    Ok(())
}

fn collider_event(bridge: &mut NativeComponent, ctx: &mut Context, event: &HostEvent) -> Result<()> {
    let target = bridge.target();
    match *event {
        HostEvent::Collision {
            phase,
            node,
            other,
            relative_velocity,
            contact,
        } => {
            if node != target && other != target {
                return Ok(());
            }
            let counterpart = if node == target { other } else { node };
            let mut detail = json!({
                "other": counterpart.as_u64(),
                "relativeVelocity": {
                    "x": relative_velocity[0],
                    "y": relative_velocity[1],
                    "z": relative_velocity[2]
                }
            });
            if let Some(point) = contact {
                detail["point"] = json!({
                    "position": { "x": point.position[0], "y": point.position[1], "z": point.position[2] },
                    "normal": { "x": point.normal[0], "y": point.normal[1], "z": point.normal[2] }
                });
            }
            let name = match phase {
                CollisionPhase::Enter => "collision-enter",
                CollisionPhase::Exit => "collision-exit",
            };
            ctx.scene.emit_node_event(NodeEvent {
                node: bridge.owner(),
                name: Cow::Borrowed(name),
                detail,
            });
        }
        HostEvent::Trigger { phase, node, other } => {
            if node != target && other != target {
                return Ok(());
            }
            let counterpart = if node == target { other } else { node };
            let name = match phase {
                CollisionPhase::Enter => "trigger-enter",
                CollisionPhase::Exit => "trigger-exit",
            };
            ctx.scene.emit_node_event(NodeEvent {
                node: bridge.owner(),
                name: Cow::Borrowed(name),
                detail: json!({ "other": counterpart.as_u64() }),
            });
        }
        _ => {}
    }
    Ok(())
}

// ---- container hooks ----

fn container_init(bridge: &mut NativeComponent, ctx: &mut Context) -> Result<()> {
    bridge.hook_state.insert("count".to_string(), json!(0));
    if ctx.scene.host.is_connected() {
        let count = ctx.subscribe("container-count-changed");
        let state = ctx.subscribe("container-state-changed");
        bridge.track_subscription(count);
        bridge.track_subscription(state);
    }
    Ok(())
}

fn container_event(bridge: &mut NativeComponent, ctx: &mut Context, event: &HostEvent) -> Result<()> {
    match event {
        HostEvent::ContainerCountChanged {
            node,
            count,
            old_count,
        } if *node == bridge.target() => {
            bridge.hook_state.insert("count".to_string(), json!(count));
            ctx.scene.emit_node_event(NodeEvent {
                node: bridge.owner(),
                name: Cow::Borrowed("container-count-changed"),
                detail: json!({ "count": count, "oldCount": old_count }),
            });
        }
        HostEvent::ContainerStateChanged { node, state, gained } if *node == bridge.target() => {
            let old_state = bridge.hook_state.get("state").cloned();
            if *gained {
                bridge
                    .hook_state
                    .insert("state".to_string(), Value::String(state.clone()));
            } else {
                bridge.hook_state.remove("state");
            }

            let name = if *gained { "stateadded" } else { "stateremoved" };
            ctx.scene.emit_node_event(NodeEvent {
                node: bridge.owner(),
                name: Cow::Borrowed(name),
                detail: json!({ "state": state }),
            });

            // "container-empty" / "container-full" fire once per state gain.
            let changed = old_state.as_ref().and_then(Value::as_str) != Some(state.as_str());
            if *gained && changed {
                ctx.scene.emit_node_event(NodeEvent {
                    node: bridge.owner(),
                    name: Cow::Owned(state.clone()),
                    detail: Value::Null,
                });
            }
        }
        _ => {}
    }
    Ok(())
}

// ---- sound hooks ----

fn sound_init(bridge: &mut NativeComponent, ctx: &mut Context) -> Result<()> {
    if ctx.scene.host.is_connected() {
        let loaded = ctx.subscribe("sound-loaded");
        bridge.track_subscription(loaded);
    }
    Ok(())
}

fn sound_event(bridge: &mut NativeComponent, ctx: &mut Context, event: &HostEvent) -> Result<()> {
    if let HostEvent::SoundLoaded { node } = *event {
        if node == bridge.target() {
            ctx.scene.emit_node_event(NodeEvent {
                node: bridge.owner(),
                name: Cow::Borrowed("sound-loaded"),
                detail: Value::Null,
            });
        }
    }
    Ok(())
}

fn sound_invoke(
    bridge: &mut NativeComponent,
    ctx: &mut Context,
    function: &str,
    _args: &[Value],
) -> Result<()> {
    let name = match function {
        "play" => "sound-played",
        "pause" => "sound-paused",
        _ => return Ok(()),
    };
    ctx.scene.emit_node_event(NodeEvent {
        node: bridge.owner(),
        name: Cow::Borrowed(name),
        detail: Value::Null,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_resolve() {
        assert!(lookup("n-object").is_some());
        assert!(lookup("n-mesh-collider").is_some());
        assert!(lookup("no-such-type").is_none());
    }

    #[test]
    fn mesh_collider_defaults_cascade() {
        let ty = lookup("n-mesh-collider").unwrap();
        assert_eq!(ty.config_defaults.recursive_mesh, Some(true));
        assert_eq!(ty.config_defaults.inherit_parent_data, Some(true));
        assert_eq!(ty.data_defaults.get("convex"), Some(&json!(true)));
    }
}
