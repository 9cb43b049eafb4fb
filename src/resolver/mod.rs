//! Resolves a task's configuration into the ordered, phase-bucketed set
//! of handlers for one run.
//!
//! The candidate set is every builtin-flagged descriptor plus every
//! descriptor explicitly named in the task configuration, minus the
//! `disable` directives. Per phase, handlers are sorted by priority
//! descending with ties broken by registration order, so invocation
//! order is a reproducible total order given the same registry and
//! configuration.

use crate::config::{ConfigValidator, TaskConfig};
use crate::errors::ConfigError;
use crate::phase::Phase;
use crate::registry::{PhaseHandler, PluginDescriptor, PluginRegistry};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// One handler scheduled for a phase, with the plugin's config for this run.
#[derive(Debug, Clone)]
pub struct PhaseBinding {
    pub plugin: Arc<PluginDescriptor>,
    pub handler: PhaseHandler,
    pub priority: i32,
    pub config: Value,
}

impl PhaseBinding {
    pub fn plugin_name(&self) -> &str {
        self.plugin.name()
    }
}

/// The resolved handler set for one task run.
#[derive(Debug, Default)]
pub struct ResolvedPlan {
    phases: HashMap<Phase, Vec<PhaseBinding>>,
}

impl ResolvedPlan {
    /// Bindings for `phase`, in invocation order. Empty when no active
    /// plugin handles the phase.
    pub fn bindings(&self, phase: Phase) -> &[PhaseBinding] {
        self.phases.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names of the active plugins, deduplicated, in registration order.
    pub fn active_plugins(&self) -> Vec<&str> {
        let mut seen: Vec<(usize, &str)> = Vec::new();
        for bindings in self.phases.values() {
            for binding in bindings {
                let key = (binding.plugin.registration_order(), binding.plugin_name());
                if !seen.contains(&key) {
                    seen.push(key);
                }
            }
        }
        seen.sort_unstable();
        seen.into_iter().map(|(_, name)| name).collect()
    }
}

/// Compute the active handler set for `task` from its configuration.
///
/// Fails when a configuration key names a plugin absent from the
/// registry, or when the external validator rejects a plugin's config
/// (the validator's error is surfaced as-is).
pub fn resolve(
    registry: &PluginRegistry,
    task: &str,
    config: &TaskConfig,
    validator: &dyn ConfigValidator,
) -> Result<ResolvedPlan, ConfigError> {
    // Every configured name must exist, even if later disabled.
    for name in config.plugins.keys() {
        if registry.get(name).is_err() {
            return Err(ConfigError::UnknownPlugin {
                task: task.to_string(),
                plugin: name.clone(),
            });
        }
    }

    let mut active: Vec<&Arc<PluginDescriptor>> = Vec::new();
    for descriptor in registry.iter() {
        let configured = config.plugins.contains_key(descriptor.name());
        if !descriptor.is_builtin() && !configured {
            continue;
        }
        if config.is_disabled(descriptor.name(), descriptor.is_builtin()) {
            tracing::debug!(task, plugin = descriptor.name(), "plugin disabled");
            continue;
        }
        if configured {
            let value = &config.plugins[descriptor.name()];
            validator.validate(descriptor, value)?;
        }
        active.push(descriptor);
    }

    let mut plan = ResolvedPlan::default();
    for &phase in Phase::all() {
        let mut bindings: Vec<PhaseBinding> = active
            .iter()
            .filter_map(|descriptor| {
                descriptor.handler_for(phase).map(|registered| PhaseBinding {
                    plugin: Arc::clone(descriptor),
                    handler: registered.handler.clone(),
                    priority: registered.priority,
                    config: config
                        .plugins
                        .get(descriptor.name())
                        .cloned()
                        .unwrap_or(Value::Null),
                })
            })
            .collect();
        // Higher priority first; registration order breaks ties.
        bindings.sort_by_key(|b| (std::cmp::Reverse(b.priority), b.plugin.registration_order()));
        if !bindings.is_empty() {
            plan.phases.insert(phase, bindings);
        }
    }
    Ok(plan)
}
