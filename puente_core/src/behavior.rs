use std::any::Any;

use anyhow::Result;
use puente_host::HostEvent;
use puente_ids::{BehaviorID, NodeID};

use crate::scene::Context;

/// An attachable unit of logic. A behavior belongs to exactly one node at a
/// time; the scene driver calls `awake` once the owning node is part of the
/// live tree, `update` every tick while awake, and `dispose` on teardown.
///
/// All lifecycle entry points are fallible; errors are caught and logged at
/// the driver boundary and never abort sibling behaviors.
pub trait Behavior: Any {
    /// Behavior kind, used for same-type lookups. Bridged components report
    /// their component type name here.
    fn type_name(&self) -> &str;

    fn awake(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    fn update(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    fn dispose(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    /// Delivered for host events the behavior subscribed to via
    /// `Context::subscribe`.
    fn on_host_event(&mut self, _ctx: &mut Context, _event: &HostEvent) -> Result<()> {
        Ok(())
    }

    /// Optional capability: produce an unattached duplicate with the same
    /// configuration and fresh instance state. Behaviors that return `None`
    /// are skipped when a subtree is cloned.
    fn clone_behavior(&self) -> Option<Box<dyn Behavior>> {
        None
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Arena slot bookkeeping for one behavior. Lifecycle flags live on the slot
/// so they stay readable while the boxed behavior is taken out for a call.
pub struct BehaviorSlot {
    pub node: NodeID,
    pub type_name: String,
    pub awake: bool,
    pub managed: bool,
    pub(crate) pending_removal: bool,
    pub(crate) behavior: Option<Box<dyn Behavior>>,
}

impl BehaviorSlot {
    /// The boxed behavior, unless it is currently taken out for a call.
    pub fn behavior(&self) -> Option<&dyn Behavior> {
        self.behavior.as_deref()
    }

    pub fn behavior_mut(&mut self) -> Option<&mut (dyn Behavior + 'static)> {
        self.behavior.as_deref_mut()
    }
}

/// Generational arena of behavior slots. Parent/child relations between
/// behaviors are `BehaviorID`s into this arena, never owning references, so
/// teardown is index invalidation rather than reference-cycle breaking.
pub struct BehaviorArena {
    slots: Vec<Option<BehaviorSlot>>,
    generations: Vec<u32>,
    free_indices: Vec<usize>,
}

impl BehaviorArena {
    pub fn new() -> Self {
        // Index 0 reserved as nil sentinel, as in NodeArena.
        let mut slots = Vec::with_capacity(2);
        let mut generations = Vec::with_capacity(2);
        slots.push(None);
        generations.push(0);
        Self {
            slots,
            generations,
            free_indices: Vec::new(),
        }
    }

    pub fn insert(&mut self, node: NodeID, behavior: Box<dyn Behavior>) -> BehaviorID {
        let slot = BehaviorSlot {
            node,
            type_name: behavior.type_name().to_string(),
            awake: false,
            managed: false,
            pending_removal: false,
            behavior: Some(behavior),
        };

        if let Some(index) = self.free_indices.pop() {
            let generation = self.generations[index];
            self.slots[index] = Some(slot);
            return BehaviorID::from_parts(index as u32, generation);
        }

        let index = self.slots.len();
        self.slots.push(Some(slot));
        self.generations.push(0);
        BehaviorID::from_parts(index as u32, 0)
    }

    pub fn get(&self, id: BehaviorID) -> Option<&BehaviorSlot> {
        if id.is_nil()
            || id.index() >= self.slots.len() as u32
            || self.generations[id.index() as usize] != id.generation()
        {
            return None;
        }
        self.slots[id.index() as usize].as_ref()
    }

    pub fn get_mut(&mut self, id: BehaviorID) -> Option<&mut BehaviorSlot> {
        if id.is_nil()
            || id.index() >= self.slots.len() as u32
            || self.generations[id.index() as usize] != id.generation()
        {
            return None;
        }
        self.slots[id.index() as usize].as_mut()
    }

    pub fn remove(&mut self, id: BehaviorID) -> Option<BehaviorSlot> {
        if id.is_nil()
            || id.index() >= self.slots.len() as u32
            || self.generations[id.index() as usize] != id.generation()
        {
            return None;
        }

        let index = id.index() as usize;
        let removed = self.slots[index].take();
        if removed.is_some() {
            self.generations[index] = self.generations[index].wrapping_add(1);
            self.free_indices.push(index);
        }
        removed
    }

    pub fn contains(&self, id: BehaviorID) -> bool {
        self.get(id).is_some()
    }

    /// Type name recorded at attach time; readable even while the behavior
    /// box is taken out for a call.
    pub fn type_name(&self, id: BehaviorID) -> Option<&str> {
        self.get(id).map(|slot| slot.type_name.as_str())
    }

    pub fn node_of(&self, id: BehaviorID) -> Option<NodeID> {
        self.get(id).map(|slot| slot.node)
    }

    pub fn is_awake(&self, id: BehaviorID) -> bool {
        self.get(id).map(|slot| slot.awake).unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BehaviorID, &BehaviorSlot)> {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(index, slot)| {
                slot.as_ref()
                    .map(|s| (BehaviorID::from_parts(index as u32, self.generations[index]), s))
            })
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }
}

impl Default for BehaviorArena {
    fn default() -> Self {
        Self::new()
    }
}
