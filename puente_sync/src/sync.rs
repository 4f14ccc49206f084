use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use puente_components::{ConfigOverlay, NativeComponent};
use puente_core::{Behavior, Context};
use puente_ids::{BehaviorID, SubscriptionID};
use serde_json::Value;

use crate::store::RemoteStore;

/// Shared handle to one synchronized location: the store, the object's base
/// path, and the host-authoritative send rate.
#[derive(Clone)]
pub struct SyncRef {
    pub store: Rc<RefCell<dyn RemoteStore>>,
    pub base_path: String,
    pub send_rate_ms: f32,
}

impl SyncRef {
    pub fn new(store: Rc<RefCell<dyn RemoteStore>>, base_path: impl Into<String>) -> Self {
        Self {
            store,
            base_path: base_path.into(),
            send_rate_ms: 100.0,
        }
    }

    pub fn with_send_rate(mut self, send_rate_ms: f32) -> Self {
        self.send_rate_ms = send_rate_ms;
        self
    }
}

/// Keeps a same-type bridge's `data` convergent with the remote location:
/// remote changes are applied locally while another party owns the object
/// (creating the bridge if the node has none yet), and local changes are
/// pushed on a fixed interval while this party owns it.
pub struct ComponentSync {
    component_type: String,
    behavior_type: String,
    sync: SyncRef,
    data_path: String,
    component: BehaviorID,
    subscription: Option<SubscriptionID>,
    accumulator_ms: f32,
    last_sent: Option<String>,
}

impl ComponentSync {
    pub fn new(component_type: impl Into<String>, sync: SyncRef) -> Self {
        let component_type = component_type.into();
        let behavior_type = format!("sync-{component_type}");
        let data_path = format!("{}/{}/data", sync.base_path, component_type);
        Self {
            component_type,
            behavior_type,
            sync,
            data_path,
            component: BehaviorID::nil(),
            subscription: None,
            accumulator_ms: 0.0,
            last_sent: None,
        }
    }

    pub fn data_path(&self) -> &str {
        &self.data_path
    }

    fn resolve_component(&mut self, ctx: &Context) {
        if !ctx.scene.behaviors.contains(self.component) {
            self.component = BehaviorID::nil();
        }
        if self.component.is_nil() {
            self.component = ctx
                .scene
                .behavior_of_type(ctx.node, &self.component_type)
                .unwrap_or_default();
        }
    }

    fn apply_remote(&mut self, ctx: &mut Context, value: &Value) {
        // Malformed or absent payloads never mutate local state.
        let Value::Object(map) = value else {
            log::debug!("ignoring malformed remote payload at {}", self.data_path);
            return;
        };

        self.resolve_component(ctx);
        if self.component.is_nil() {
            let bridge = NativeComponent::new(
                self.component_type.clone(),
                value.clone(),
                ConfigOverlay::none(),
            );
            self.component = ctx.scene.attach_behavior(ctx.node, Box::new(bridge));
            return;
        }

        let component = self.component;
        let map = map.clone();
        ctx.with_behavior(component, move |behavior, _| {
            if let Some(bridge) = behavior.as_any_mut().downcast_mut::<NativeComponent>() {
                bridge.data = map;
            }
        });
    }

    fn push_if_changed(&mut self, ctx: &mut Context) -> Result<()> {
        self.resolve_component(ctx);
        if self.component.is_nil() {
            return Ok(());
        }
        let Some(slot) = ctx.scene.behaviors.get(self.component) else {
            return Ok(());
        };
        let Some(bridge) = slot
            .behavior()
            .and_then(|b| b.as_any().downcast_ref::<NativeComponent>())
        else {
            return Ok(());
        };

        let snapshot = serde_json::to_string(&bridge.data)?;
        if self.last_sent.as_deref() != Some(snapshot.as_str()) {
            let value = Value::Object(bridge.data.clone());
            self.sync.store.borrow_mut().set(&self.data_path, value);
            self.last_sent = Some(snapshot);
        }
        Ok(())
    }
}

impl Behavior for ComponentSync {
    fn type_name(&self) -> &str {
        &self.behavior_type
    }

    fn awake(&mut self, ctx: &mut Context) -> Result<()> {
        ctx.mark_managed();
        self.accumulator_ms = 0.0;
        self.last_sent = None;
        self.resolve_component(ctx);
        self.subscription = Some(self.sync.store.borrow_mut().on_value(&self.data_path));
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context) -> Result<()> {
        if let Some(subscription) = self.subscription {
            let mut changes = Vec::new();
            self.sync
                .store
                .borrow_mut()
                .take_changes(subscription, &mut changes);
            if !changes.is_empty() && !self.sync.store.borrow().is_owner(&self.data_path) {
                for value in &changes {
                    self.apply_remote(ctx, value);
                }
            }
        }

        self.accumulator_ms += ctx.delta_ms;
        if self.accumulator_ms >= self.sync.send_rate_ms {
            self.accumulator_ms -= self.sync.send_rate_ms;
            if self.sync.store.borrow().is_owner(&self.data_path) {
                self.push_if_changed(ctx)?;
            }
        }
        Ok(())
    }

    fn dispose(&mut self, _ctx: &mut Context) -> Result<()> {
        self.accumulator_ms = 0.0;
        if let Some(subscription) = self.subscription.take() {
            self.sync
                .store
                .borrow_mut()
                .off_value(&self.data_path, subscription);
        }
        self.component = BehaviorID::nil();
        self.last_sent = None;
        Ok(())
    }

    fn clone_behavior(&self) -> Option<Box<dyn Behavior>> {
        Some(Box::new(Self::new(
            self.component_type.clone(),
            self.sync.clone(),
        )))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
