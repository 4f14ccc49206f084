/// Resolved per-bridge configuration. Built by merging the global defaults,
/// then the component type's defaults, then caller overrides — later sources
/// win, field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentConfig {
    /// Push data changes to the host.
    pub send_updates: bool,
    /// Auto-attach the component to every descendant node.
    pub recursive: bool,
    /// Auto-attach the component to every drawable descendant.
    pub recursive_mesh: bool,
    /// Keep the host's default collision volume instead of disabling it.
    pub use_collider: bool,
    /// Skip host pushes unless the serialized data changed since last push.
    pub update_on_stale_data: bool,
    /// Allow the proxy placeholder to be shared with sibling bridges.
    pub shared_component: bool,
    /// Overwrite `data` each tick from the nearest ancestor bridge of the
    /// same type.
    pub inherit_parent_data: bool,
    /// Host registration is restricted to host-representable targets.
    pub mesh_component: bool,
}

impl ComponentConfig {
    pub const DEFAULT: Self = Self {
        send_updates: true,
        recursive: false,
        recursive_mesh: false,
        use_collider: false,
        update_on_stale_data: true,
        shared_component: true,
        inherit_parent_data: false,
        mesh_component: false,
    };

    pub fn merged(type_defaults: &ConfigOverlay, overrides: &ConfigOverlay) -> Self {
        let mut config = Self::DEFAULT;
        config.apply(type_defaults);
        config.apply(overrides);
        config
    }

    pub fn apply(&mut self, overlay: &ConfigOverlay) {
        if let Some(v) = overlay.send_updates {
            self.send_updates = v;
        }
        if let Some(v) = overlay.recursive {
            self.recursive = v;
        }
        if let Some(v) = overlay.recursive_mesh {
            self.recursive_mesh = v;
        }
        if let Some(v) = overlay.use_collider {
            self.use_collider = v;
        }
        if let Some(v) = overlay.update_on_stale_data {
            self.update_on_stale_data = v;
        }
        if let Some(v) = overlay.shared_component {
            self.shared_component = v;
        }
        if let Some(v) = overlay.inherit_parent_data {
            self.inherit_parent_data = v;
        }
        if let Some(v) = overlay.mesh_component {
            self.mesh_component = v;
        }
    }
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Partial configuration: only the fields a source actually specifies.
/// Unspecified fields retain whatever an earlier merge source set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigOverlay {
    pub send_updates: Option<bool>,
    pub recursive: Option<bool>,
    pub recursive_mesh: Option<bool>,
    pub use_collider: Option<bool>,
    pub update_on_stale_data: Option<bool>,
    pub shared_component: Option<bool>,
    pub inherit_parent_data: Option<bool>,
    pub mesh_component: Option<bool>,
}

impl ConfigOverlay {
    pub const fn none() -> Self {
        Self {
            send_updates: None,
            recursive: None,
            recursive_mesh: None,
            use_collider: None,
            update_on_stale_data: None,
            shared_component: None,
            inherit_parent_data: None,
            mesh_component: None,
        }
    }
}

impl From<&ComponentConfig> for ConfigOverlay {
    /// Fully-specified overlay; merging it reproduces `config` exactly.
    /// Used to hand a resolved configuration down to auto-attached children.
    fn from(config: &ComponentConfig) -> Self {
        Self {
            send_updates: Some(config.send_updates),
            recursive: Some(config.recursive),
            recursive_mesh: Some(config.recursive_mesh),
            use_collider: Some(config.use_collider),
            update_on_stale_data: Some(config.update_on_stale_data),
            shared_component: Some(config.shared_component),
            inherit_parent_data: Some(config.inherit_parent_data),
            mesh_component: Some(config.mesh_component),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_sources_win_field_by_field() {
        let type_defaults = ConfigOverlay {
            recursive_mesh: Some(true),
            inherit_parent_data: Some(true),
            mesh_component: Some(true),
            ..ConfigOverlay::none()
        };
        let overrides = ConfigOverlay {
            inherit_parent_data: Some(false),
            send_updates: Some(false),
            ..ConfigOverlay::none()
        };

        let config = ComponentConfig::merged(&type_defaults, &overrides);
        assert!(config.recursive_mesh); // from type defaults
        assert!(!config.inherit_parent_data); // caller overrode type default
        assert!(!config.send_updates); // caller overrode global default
        assert!(config.update_on_stale_data); // untouched global default
        assert!(config.shared_component); // untouched global default
    }

    #[test]
    fn empty_overlays_yield_global_defaults() {
        let config = ComponentConfig::merged(&ConfigOverlay::none(), &ConfigOverlay::none());
        assert_eq!(config, ComponentConfig::DEFAULT);
    }

    #[test]
    fn resolved_config_round_trips_through_overlay() {
        let mut config = ComponentConfig::DEFAULT;
        config.recursive = true;
        config.send_updates = false;

        let overlay = ConfigOverlay::from(&config);
        let rebuilt = ComponentConfig::merged(&ConfigOverlay::none(), &overlay);
        assert_eq!(rebuilt, config);
    }
}
