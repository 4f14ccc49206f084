use std::any::Any;

use anyhow::Result;
use puente_core::{Behavior, Context, Node};
use puente_ids::NodeID;
use serde_json::json;

use crate::config::ConfigOverlay;
use crate::native::NativeComponent;

/// How long preloaded sounds are kept alive before the behavior removes
/// itself, in milliseconds.
const PRELOAD_LIFETIME_MS: f32 = 10_000.0;

/// Silently loads and plays the given sound resources so the host caches
/// them for later use. Attaches one muted autoplaying `n-sound` bridge per
/// source to a hidden child node, then removes itself once they have had
/// time to load.
pub struct PreloadNativeSounds {
    sounds: Vec<String>,
    holder: NodeID,
    elapsed_ms: f32,
}

impl PreloadNativeSounds {
    pub fn new(sounds: Vec<String>) -> Self {
        Self {
            sounds,
            holder: NodeID::nil(),
            elapsed_ms: 0.0,
        }
    }
}

impl Behavior for PreloadNativeSounds {
    fn type_name(&self) -> &str {
        "PreloadSoundEffects"
    }

    fn awake(&mut self, ctx: &mut Context) -> Result<()> {
        ctx.mark_managed();
        self.elapsed_ms = 0.0;

        let mut holder = Node::new("sound-preload");
        holder.visible = false;
        self.holder = ctx.scene.add_node(holder, ctx.node);

        for sound in &self.sounds {
            ctx.scene.attach_behavior(
                self.holder,
                Box::new(NativeComponent::new(
                    "n-sound",
                    json!({
                        "src": sound,
                        "volume": 0,
                        "oneshot": true,
                        "autoplay": true
                    }),
                    ConfigOverlay::none(),
                )),
            );
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context) -> Result<()> {
        self.elapsed_ms += ctx.delta_ms;
        if self.elapsed_ms >= PRELOAD_LIFETIME_MS {
            let holder = std::mem::take(&mut self.holder);
            ctx.scene.destroy_node(holder);
            let behavior = ctx.behavior;
            ctx.scene.remove_behavior(behavior);
        }
        Ok(())
    }

    fn dispose(&mut self, ctx: &mut Context) -> Result<()> {
        ctx.scene.destroy_node(self.holder);
        self.holder = NodeID::nil();
        self.elapsed_ms = 0.0;
        Ok(())
    }

    fn clone_behavior(&self) -> Option<Box<dyn Behavior>> {
        Some(Box::new(Self::new(self.sounds.clone())))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use puente_host::RecordingHost;

    use super::*;

    #[test]
    fn preloader_attaches_muted_sounds_and_removes_itself() {
        let mut scene = puente_core::Scene::new(Box::new(RecordingHost::new()));
        let node = scene.add_node(Node::new("stage"), scene.root());
        let id = scene.attach_behavior(
            node,
            Box::new(PreloadNativeSounds::new(vec![
                "audio/ding.wav".to_string(),
                "audio/buzz.wav".to_string(),
            ])),
        );

        scene.update(16.0);
        let holder = scene.nodes.get(node).unwrap().children[0];
        assert_eq!(
            scene
                .nodes
                .get(holder)
                .unwrap()
                .behaviors
                .iter()
                .filter(|&&b| scene.behaviors.type_name(b) == Some("n-sound"))
                .count(),
            2
        );

        // Run past the preload lifetime: behavior and holder disappear.
        for _ in 0..700 {
            scene.update(16.0);
        }
        assert!(!scene.behaviors.contains(id));
        assert!(!scene.nodes.contains(holder));
        assert!(scene.nodes.get(node).unwrap().children.is_empty());
    }
}
