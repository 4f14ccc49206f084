use std::cell::RefCell;
use std::rc::Rc;

use puente_components::{ConfigOverlay, NativeComponent, invoke};
use puente_core::{Node, Scene};
use puente_host::{HostEvent, RecordingHost};
use puente_sync::{ComponentSync, MemoryStore, RemoteStore, SyncRef};
use serde_json::json;

const TICK_MS: f32 = 16.0;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let host = RecordingHost::new();
    let commands = host.commands();
    let events = host.events();
    let mut scene = Scene::new(Box::new(host));

    // A little stage: one drawable floor, a gadget that needs a proxy, and a
    // subtree the mesh collider spreads over.
    let floor = scene.add_node(Node::drawable("floor"), scene.root());
    let gadget = scene.add_node(Node::new("gadget"), scene.root());
    let group = scene.add_node(Node::new("group"), scene.root());
    let _crate_a = scene.add_node(Node::drawable("crate-a"), group);
    let _crate_b = scene.add_node(Node::drawable("crate-b"), group);

    scene.attach_behavior(
        floor,
        Box::new(NativeComponent::new(
            "n-object",
            json!({ "res": "architecture/floor-4x4" }),
            ConfigOverlay::none(),
        )),
    );
    let sound = scene.attach_behavior(
        gadget,
        Box::new(NativeComponent::new(
            "n-sound",
            json!({ "src": "audio/hum.wav", "loop": true }),
            ConfigOverlay::none(),
        )),
    );
    scene.attach_behavior(
        gadget,
        Box::new(NativeComponent::with_defaults("n-container")),
    );
    scene.attach_behavior(
        group,
        Box::new(NativeComponent::with_defaults("n-mesh-collider")),
    );

    // Mirror the floor object through an in-memory store, as the owner.
    let store = Rc::new(RefCell::new(MemoryStore::new()));
    store.borrow_mut().set_owner("demo/floor/n-object/data", true);
    scene.attach_behavior(
        floor,
        Box::new(ComponentSync::new(
            "n-object",
            SyncRef::new(
                Rc::clone(&store) as Rc<RefCell<dyn RemoteStore>>,
                "demo/floor",
            ),
        )),
    );

    for tick in 0..20 {
        if tick == 5 {
            if let Some(record) = scene.shared_proxies.get(gadget) {
                events.borrow_mut().push(HostEvent::ContainerCountChanged {
                    node: record.placeholder,
                    count: 1,
                    old_count: 0,
                });
            }
        }
        if tick == 8 {
            invoke(&mut scene, sound, "play", &[]);
        }
        scene.update(TICK_MS);
    }

    for event in scene.take_node_events() {
        let node = scene
            .nodes
            .get(event.node)
            .map(|n| n.name.as_ref())
            .unwrap_or("<gone>");
        println!("node event: {} on '{}' {}", event.name, node, event.detail);
    }

    println!("\nhost traffic ({} commands):", commands.borrow().len());
    for command in commands.borrow().iter() {
        println!("  {command:?}");
    }

    println!(
        "\nstore value for demo/floor: {}",
        store
            .borrow()
            .value("demo/floor/n-object/data")
            .cloned()
            .unwrap_or(serde_json::Value::Null)
    );

    print_tree(&scene, scene.root(), 0);
}

fn print_tree(scene: &Scene, node: puente_ids::NodeID, depth: usize) {
    let Some(n) = scene.nodes.get(node) else {
        return;
    };
    let behaviors: Vec<&str> = n
        .behaviors
        .iter()
        .filter_map(|&b| scene.behaviors.type_name(b))
        .collect();
    println!(
        "{}{} {}{}",
        "  ".repeat(depth),
        n.name,
        if n.drawable { "[mesh] " } else { "" },
        if behaviors.is_empty() {
            String::new()
        } else {
            format!("{behaviors:?}")
        }
    );
    for &child in &n.children {
        print_tree(scene, child, depth + 1);
    }
}
