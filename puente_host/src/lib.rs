use std::cell::RefCell;
use std::rc::Rc;

use puente_ids::NodeID;
use serde_json::Value;

/// Outgoing, fire-and-forget requests to the host. Components are addressed
/// by owning node plus component type name; the host resolves the pair to its
/// internal representation.
#[derive(Debug, Clone)]
pub enum HostCommand {
    AddComponent {
        node: NodeID,
        component: String,
    },
    UpdateComponent {
        node: NodeID,
        component: String,
        data: Value,
    },
    CallComponent {
        node: NodeID,
        component: String,
        function: String,
        args: Vec<Value>,
    },
    RemoveComponent {
        node: NodeID,
        component: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPhase {
    Enter,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Named asynchronous notifications delivered by the host, one or more ticks
/// after the command that caused them.
#[derive(Debug, Clone)]
pub enum HostEvent {
    Collision {
        phase: CollisionPhase,
        node: NodeID,
        other: NodeID,
        relative_velocity: [f32; 3],
        // Exit events sometimes carry no contact point.
        contact: Option<ContactPoint>,
    },
    Trigger {
        phase: CollisionPhase,
        node: NodeID,
        other: NodeID,
    },
    SoundLoaded {
        node: NodeID,
    },
    ContainerCountChanged {
        node: NodeID,
        count: u32,
        old_count: u32,
    },
    ContainerStateChanged {
        node: NodeID,
        state: String,
        gained: bool,
    },
    TransformUpdate {
        node: NodeID,
        position: [f32; 3],
        rotation: [f32; 4],
    },
}

impl HostEvent {
    /// Stable event name used for subscription routing.
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::Collision { .. } => "collision",
            HostEvent::Trigger { .. } => "trigger",
            HostEvent::SoundLoaded { .. } => "sound-loaded",
            HostEvent::ContainerCountChanged { .. } => "container-count-changed",
            HostEvent::ContainerStateChanged { .. } => "container-state-changed",
            HostEvent::TransformUpdate { .. } => "transform-update",
        }
    }

    /// The node the host reports the event against.
    pub fn node(&self) -> NodeID {
        match *self {
            HostEvent::Collision { node, .. } => node,
            HostEvent::Trigger { node, .. } => node,
            HostEvent::SoundLoaded { node } => node,
            HostEvent::ContainerCountChanged { node, .. } => node,
            HostEvent::ContainerStateChanged { node, .. } => node,
            HostEvent::TransformUpdate { node, .. } => node,
        }
    }
}

pub trait HostBridge {
    /// Whether a live host is on the other end. When false, callers must
    /// treat every operation as a no-op.
    fn is_connected(&self) -> bool;

    fn submit(&mut self, command: HostCommand);

    fn submit_many<I>(&mut self, commands: I)
    where
        I: IntoIterator<Item = HostCommand>,
        Self: Sized,
    {
        for command in commands {
            self.submit(command);
        }
    }

    fn drain_events(&mut self, out: &mut Vec<HostEvent>);
}

/// Absent-host mode: every command is dropped, no events ever arrive.
#[derive(Debug, Default)]
pub struct OfflineHost;

impl HostBridge for OfflineHost {
    fn is_connected(&self) -> bool {
        false
    }

    fn submit(&mut self, command: HostCommand) {
        log::debug!("host offline, dropping {command:?}");
    }

    fn drain_events(&mut self, _out: &mut Vec<HostEvent>) {}
}

/// Host double that records every submitted command and replays injected
/// events. The command log and event queue are shared handles so they stay
/// inspectable after the host has been moved into a scene.
pub struct RecordingHost {
    commands: Rc<RefCell<Vec<HostCommand>>>,
    events: Rc<RefCell<Vec<HostEvent>>>,
    connected: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            commands: Rc::new(RefCell::new(Vec::new())),
            events: Rc::new(RefCell::new(Vec::new())),
            connected: true,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new()
        }
    }

    /// Shared handle to the command log.
    pub fn commands(&self) -> Rc<RefCell<Vec<HostCommand>>> {
        Rc::clone(&self.commands)
    }

    /// Shared handle to the pending event queue; pushed events are delivered
    /// on the next drain.
    pub fn events(&self) -> Rc<RefCell<Vec<HostEvent>>> {
        Rc::clone(&self.events)
    }
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBridge for RecordingHost {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn submit(&mut self, command: HostCommand) {
        self.commands.borrow_mut().push(command);
    }

    fn drain_events(&mut self, out: &mut Vec<HostEvent>) {
        out.append(&mut self.events.borrow_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_host_logs_commands() {
        let mut host = RecordingHost::new();
        let commands = host.commands();
        host.submit(HostCommand::AddComponent {
            node: NodeID::new(1),
            component: "n-object".into(),
        });
        assert_eq!(commands.borrow().len(), 1);
    }

    #[test]
    fn recording_host_replays_events_once() {
        let mut host = RecordingHost::new();
        host.events().borrow_mut().push(HostEvent::SoundLoaded {
            node: NodeID::new(2),
        });

        let mut out = Vec::new();
        host.drain_events(&mut out);
        assert_eq!(out.len(), 1);

        out.clear();
        host.drain_events(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn offline_host_swallows_everything() {
        let mut host = OfflineHost;
        assert!(!host.is_connected());
        host.submit(HostCommand::RemoveComponent {
            node: NodeID::new(3),
            component: "n-text".into(),
        });
        let mut out = Vec::new();
        host.drain_events(&mut out);
        assert!(out.is_empty());
    }
}
