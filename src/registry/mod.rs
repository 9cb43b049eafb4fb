//! The process-wide plugin catalog.
//!
//! The registry is an explicit, passed-in table rather than true global
//! state: it is populated once at process startup, then shared immutably
//! (typically behind an `Arc`) with every task. There is no removal
//! operation; changing the catalog requires a restart. Tests construct
//! their own isolated registries.

mod descriptor;
mod handler;

pub use descriptor::{DEFAULT_PRIORITY, PluginBuilder, PluginDescriptor, RegisteredHandler};
pub use handler::{
    EntryFn, EntryHandler, HandlerContext, HandlerResult, PhaseHandler, TaskFn, TaskHandler,
};

use crate::errors::RegistryError;
use std::collections::HashMap;
use std::sync::Arc;

/// Catalog of plugin descriptors keyed by name, preserving registration
/// order for deterministic priority tie-breaks.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<PluginDescriptor>>,
    by_name: HashMap<String, usize>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Fails if the name is already taken or the
    /// descriptor carries no metadata worth dispatching on (no handler
    /// and no interface).
    pub fn register(&mut self, mut descriptor: PluginDescriptor) -> Result<(), RegistryError> {
        if descriptor.name().is_empty() {
            return Err(RegistryError::InvalidDescriptor {
                name: String::new(),
                reason: "plugin name must not be empty".into(),
            });
        }
        if !descriptor.has_handlers() && descriptor.interfaces().is_empty() {
            return Err(RegistryError::InvalidDescriptor {
                name: descriptor.name().to_string(),
                reason: "descriptor declares no handler and no interface".into(),
            });
        }
        if self.by_name.contains_key(descriptor.name()) {
            return Err(RegistryError::DuplicateName {
                name: descriptor.name().to_string(),
            });
        }
        descriptor.order = self.plugins.len();
        self.by_name
            .insert(descriptor.name().to_string(), descriptor.order);
        tracing::debug!(
            plugin = descriptor.name(),
            builtin = descriptor.is_builtin(),
            "registered plugin"
        );
        self.plugins.push(Arc::new(descriptor));
        Ok(())
    }

    /// Look a plugin up by name.
    pub fn get(&self, name: &str) -> Result<&Arc<PluginDescriptor>, RegistryError> {
        self.by_name
            .get(name)
            .map(|&idx| &self.plugins[idx])
            .ok_or_else(|| RegistryError::UnknownPlugin {
                name: name.to_string(),
            })
    }

    /// All descriptors declaring `interface`, in registration order.
    pub fn get_by_interface(&self, interface: &str) -> Vec<&Arc<PluginDescriptor>> {
        self.plugins
            .iter()
            .filter(|p| p.interfaces().iter().any(|i| i == interface))
            .collect()
    }

    /// All descriptors belonging to `group`, in registration order.
    pub fn get_by_group(&self, group: &str) -> Vec<&Arc<PluginDescriptor>> {
        self.plugins
            .iter()
            .filter(|p| p.groups().iter().any(|g| g == group))
            .collect()
    }

    /// All descriptors, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PluginDescriptor>> {
        self.plugins.iter()
    }

    /// Builtin-flagged descriptors, in registration order.
    pub fn builtins(&self) -> impl Iterator<Item = &Arc<PluginDescriptor>> {
        self.plugins.iter().filter(|p| p.is_builtin())
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
