mod behavior;
mod events;
mod node;
mod node_arena;
mod proxy;
mod scene;

pub use behavior::{Behavior, BehaviorArena, BehaviorSlot};
pub use events::{EventRouter, NodeEvent, Subscription};
pub use node::{HOST_METADATA_KEY, Node};
pub use node_arena::NodeArena;
pub use proxy::{SharedProxyRecord, SharedProxyTable};
pub use scene::{Context, Scene, Timing};

pub mod prelude {
    pub use crate::{Behavior, Context, Node, NodeEvent, Scene};
    pub use puente_host::{HostBridge, HostCommand, HostEvent};
    pub use puente_ids::prelude::{BehaviorID, NodeID, SubscriptionID};
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::cell::Cell;
    use std::rc::Rc;

    use anyhow::{Result, bail};
    use puente_host::RecordingHost;

    use super::*;

    /// Test behavior that counts its lifecycle transitions through shared
    /// cells, so the counts stay readable after the scene takes ownership.
    struct Probe {
        name: &'static str,
        awakes: Rc<Cell<u32>>,
        updates: Rc<Cell<u32>>,
        disposes: Rc<Cell<u32>>,
        fail_dispose: bool,
        manage_on_awake: bool,
    }

    impl Probe {
        fn new(name: &'static str) -> (Self, Rc<Cell<u32>>, Rc<Cell<u32>>, Rc<Cell<u32>>) {
            let awakes = Rc::new(Cell::new(0));
            let updates = Rc::new(Cell::new(0));
            let disposes = Rc::new(Cell::new(0));
            let probe = Self {
                name,
                awakes: Rc::clone(&awakes),
                updates: Rc::clone(&updates),
                disposes: Rc::clone(&disposes),
                fail_dispose: false,
                manage_on_awake: true,
            };
            (probe, awakes, updates, disposes)
        }
    }

    impl Behavior for Probe {
        fn type_name(&self) -> &str {
            self.name
        }

        fn awake(&mut self, ctx: &mut Context) -> Result<()> {
            if self.manage_on_awake {
                ctx.mark_managed();
            }
            self.awakes.set(self.awakes.get() + 1);
            Ok(())
        }

        fn update(&mut self, _ctx: &mut Context) -> Result<()> {
            self.updates.set(self.updates.get() + 1);
            Ok(())
        }

        fn dispose(&mut self, _ctx: &mut Context) -> Result<()> {
            self.disposes.set(self.disposes.get() + 1);
            if self.fail_dispose {
                bail!("intentional dispose failure");
            }
            Ok(())
        }

        fn clone_behavior(&self) -> Option<Box<dyn Behavior>> {
            Some(Box::new(Self {
                name: self.name,
                awakes: Rc::clone(&self.awakes),
                updates: Rc::clone(&self.updates),
                disposes: Rc::clone(&self.disposes),
                fail_dispose: self.fail_dispose,
                manage_on_awake: self.manage_on_awake,
            }))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn scene() -> Scene {
        Scene::new(Box::new(RecordingHost::new()))
    }

    #[test]
    fn behaviors_awake_once_attached_to_live_tree() {
        let mut scene = scene();
        let node = scene.add_node(Node::new("a"), scene.root());
        let (probe, awakes, updates, _) = Probe::new("probe");
        scene.attach_behavior(node, Box::new(probe));

        scene.update(16.0);
        assert_eq!(awakes.get(), 1);
        assert_eq!(updates.get(), 0);

        scene.update(16.0);
        assert_eq!(awakes.get(), 1);
        assert_eq!(updates.get(), 1);
    }

    #[test]
    fn detached_nodes_never_awake() {
        let mut scene = scene();
        let node = scene.add_node(Node::new("loose"), puente_ids::NodeID::nil());
        let (probe, awakes, _, _) = Probe::new("probe");
        scene.attach_behavior(node, Box::new(probe));

        scene.update(16.0);
        assert_eq!(awakes.get(), 0);

        scene.attach(node, scene.root());
        scene.update(16.0);
        assert_eq!(awakes.get(), 1);
    }

    #[test]
    fn managed_behavior_disposes_on_detach_and_reawakes_on_reattach() {
        let mut scene = scene();
        let node = scene.add_node(Node::new("b"), scene.root());
        let (probe, awakes, _, disposes) = Probe::new("probe");
        let id = scene.attach_behavior(node, Box::new(probe));

        scene.update(16.0);
        assert_eq!(awakes.get(), 1);

        scene.detach(node);
        assert_eq!(disposes.get(), 1);
        assert!(!scene.behaviors.is_awake(id));
        // Still attached to the node — managed teardown never removes.
        assert!(scene.behaviors.contains(id));

        // Detaching again without re-entry fires nothing (observer is one-shot).
        scene.attach(node, scene.root());
        scene.update(16.0);
        assert_eq!(awakes.get(), 2);

        scene.detach(node);
        assert_eq!(disposes.get(), 2);
    }

    #[test]
    fn managed_teardown_covers_the_whole_subtree() {
        let mut scene = scene();
        let parent = scene.add_node(Node::new("parent"), scene.root());
        let child = scene.add_node(Node::new("child"), parent);

        let (p1, _, _, d1) = Probe::new("one");
        let (p2, _, _, d2) = Probe::new("two");
        scene.attach_behavior(parent, Box::new(p1));
        scene.attach_behavior(child, Box::new(p2));

        scene.update(16.0);
        scene.detach(parent);

        assert_eq!(d1.get(), 1);
        assert_eq!(d2.get(), 1);
    }

    #[test]
    fn failing_dispose_never_blocks_siblings() {
        let mut scene = scene();
        let node = scene.add_node(Node::new("c"), scene.root());

        let (mut bad, _, _, bad_disposes) = Probe::new("bad");
        bad.fail_dispose = true;
        let (good, _, _, good_disposes) = Probe::new("good");

        scene.attach_behavior(node, Box::new(bad));
        scene.attach_behavior(node, Box::new(good));

        scene.update(16.0);
        scene.detach(node);

        assert_eq!(bad_disposes.get(), 1);
        assert_eq!(good_disposes.get(), 1);
    }

    #[test]
    fn unmanaged_behaviors_survive_detach() {
        let mut scene = scene();
        let node = scene.add_node(Node::new("d"), scene.root());
        let (mut probe, _, _, disposes) = Probe::new("manual");
        probe.manage_on_awake = false;
        let id = scene.attach_behavior(node, Box::new(probe));

        scene.update(16.0);
        scene.detach(node);
        assert_eq!(disposes.get(), 0);
        assert!(scene.behaviors.is_awake(id));
    }

    #[test]
    fn remove_behavior_disposes_and_purges() {
        let mut scene = scene();
        let node = scene.add_node(Node::new("e"), scene.root());
        let (probe, _, _, disposes) = Probe::new("probe");
        let id = scene.attach_behavior(node, Box::new(probe));

        scene.update(16.0);
        scene.remove_behavior(id);

        assert_eq!(disposes.get(), 1);
        assert!(!scene.behaviors.contains(id));
        assert!(scene.nodes.get(node).unwrap().behaviors.is_empty());
    }

    #[test]
    fn destroy_node_takes_subtree_and_behaviors_with_it() {
        let mut scene = scene();
        let parent = scene.add_node(Node::new("parent"), scene.root());
        let child = scene.add_node(Node::new("child"), parent);
        let (probe, _, _, disposes) = Probe::new("probe");
        scene.attach_behavior(child, Box::new(probe));

        scene.update(16.0);
        scene.destroy_node(parent);

        assert_eq!(disposes.get(), 1);
        assert!(!scene.nodes.contains(parent));
        assert!(!scene.nodes.contains(child));
    }

    #[test]
    fn clone_with_behaviors_duplicates_cloneable_behaviors() {
        let mut scene = scene();
        let node = scene.add_node(Node::drawable("src"), scene.root());
        let child = scene.add_node(Node::new("src-child"), node);
        let (probe, _, _, _) = Probe::new("probe");
        scene.attach_behavior(child, Box::new(probe));

        let copy = scene.clone_with_behaviors(node, true).unwrap();
        assert!(scene.nodes.get(copy).unwrap().parent.is_nil());
        assert!(scene.nodes.get(copy).unwrap().drawable);

        let copy_child = scene.nodes.get(copy).unwrap().children[0];
        assert_eq!(
            scene.nodes.get(copy_child).unwrap().behaviors.len(),
            1,
            "cloneable behavior should be carried over"
        );
    }

    #[test]
    fn in_live_tree_follows_parent_chain() {
        let mut scene = scene();
        let a = scene.add_node(Node::new("a"), scene.root());
        let b = scene.add_node(Node::new("b"), a);
        assert!(scene.in_live_tree(b));

        scene.detach(a);
        assert!(!scene.in_live_tree(b));
        assert!(!scene.in_live_tree(a));
    }
}
