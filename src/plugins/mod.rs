//! Plugins shipped with the engine.
//!
//! `seen` and `backlog` are builtin (active on every task unless
//! disabled); `accept_all` must be configured explicitly. All of them go
//! through the same registry and dispatch machinery as external plugins.

pub mod accept_all;
pub mod backlog;
pub mod seen;

use crate::errors::RegistryError;
use crate::registry::PluginRegistry;
use std::sync::Arc;

/// Register every shipped plugin with in-memory backing stores.
pub fn register_shipped(registry: &mut PluginRegistry) -> Result<(), RegistryError> {
    seen::register(registry, Arc::new(seen::MemorySeenStore::default()))?;
    backlog::register(registry, backlog::BacklogStore::default())?;
    accept_all::register(registry)?;
    Ok(())
}
