//! Plugin descriptors: the per-plugin metadata the engine dispatches on.

use super::handler::{EntryHandler, PhaseHandler, TaskHandler};
use crate::phase::Phase;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Default priority for handlers that do not declare one. Higher
/// priorities run first within a phase.
pub const DEFAULT_PRIORITY: i32 = 0;

/// A handler bound to a phase with its priority.
#[derive(Debug, Clone)]
pub struct RegisteredHandler {
    pub handler: PhaseHandler,
    pub priority: i32,
}

/// Immutable metadata for one plugin: name, declared interfaces and
/// groups, per-phase handlers with priorities, the builtin flag, and the
/// configuration schema consumed by the external validator.
///
/// Descriptors are registered exactly once during process startup and
/// never change afterwards.
#[derive(Debug)]
pub struct PluginDescriptor {
    name: String,
    interfaces: Vec<String>,
    groups: Vec<String>,
    builtin: bool,
    schema: Value,
    handlers: HashMap<Phase, RegisteredHandler>,
    /// Registration index, assigned by the registry; breaks priority ties.
    pub(crate) order: usize,
}

impl PluginDescriptor {
    /// Start building a descriptor for the plugin `name`.
    pub fn builder(name: impl Into<String>) -> PluginBuilder {
        PluginBuilder {
            name: name.into(),
            interfaces: Vec::new(),
            groups: Vec::new(),
            builtin: false,
            schema: Value::Null,
            handlers: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Builtin plugins are active on every task unless explicitly disabled.
    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// The declared configuration schema, as given to the external validator.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    pub fn handler_for(&self, phase: Phase) -> Option<&RegisteredHandler> {
        self.handlers.get(&phase)
    }

    /// Phases this plugin handles, in pipeline order.
    pub fn phases(&self) -> Vec<Phase> {
        Phase::all()
            .iter()
            .copied()
            .filter(|p| self.handlers.contains_key(p))
            .collect()
    }

    pub fn has_handlers(&self) -> bool {
        !self.handlers.is_empty()
    }

    /// Registration order within the registry.
    pub fn registration_order(&self) -> usize {
        self.order
    }
}

/// Builder for [`PluginDescriptor`].
pub struct PluginBuilder {
    name: String,
    interfaces: Vec<String>,
    groups: Vec<String>,
    builtin: bool,
    schema: Value,
    handlers: HashMap<Phase, RegisteredHandler>,
}

impl PluginBuilder {
    /// Mark the plugin as builtin: active on every task unless disabled.
    pub fn builtin(mut self) -> Self {
        self.builtin = true;
        self
    }

    /// Declare an interface this plugin satisfies (e.g. "filter").
    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Declare a group this plugin belongs to.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Declare the configuration schema for the external validator.
    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    /// Register a whole-task handler for `phase`. A later registration
    /// for the same phase replaces the earlier one.
    pub fn on_task(
        mut self,
        phase: Phase,
        priority: i32,
        handler: impl TaskHandler + 'static,
    ) -> Self {
        self.handlers.insert(
            phase,
            RegisteredHandler {
                handler: PhaseHandler::Task(Arc::new(handler)),
                priority,
            },
        );
        self
    }

    /// Register a per-entry handler for `phase`.
    pub fn on_entry(
        mut self,
        phase: Phase,
        priority: i32,
        handler: impl EntryHandler + 'static,
    ) -> Self {
        self.handlers.insert(
            phase,
            RegisteredHandler {
                handler: PhaseHandler::Entry(Arc::new(handler)),
                priority,
            },
        );
        self
    }

    pub fn build(self) -> PluginDescriptor {
        PluginDescriptor {
            name: self.name,
            interfaces: self.interfaces,
            groups: self.groups,
            builtin: self.builtin,
            schema: self.schema,
            handlers: self.handlers,
            order: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::handler::{HandlerContext, HandlerResult, TaskFn};
    use crate::task::TaskRun;

    fn noop() -> TaskFn<impl Fn(&mut TaskRun, &HandlerContext) -> HandlerResult + Send + Sync> {
        TaskFn(|_: &mut TaskRun, _: &HandlerContext| Ok(()))
    }

    #[test]
    fn test_builder_collects_metadata() {
        let descriptor = PluginDescriptor::builder("seen")
            .builtin()
            .interface("filter")
            .group("state")
            .schema(serde_json::json!({"type": "boolean"}))
            .on_task(Phase::Learn, DEFAULT_PRIORITY, noop())
            .build();

        assert_eq!(descriptor.name(), "seen");
        assert!(descriptor.is_builtin());
        assert_eq!(descriptor.interfaces(), ["filter"]);
        assert_eq!(descriptor.groups(), ["state"]);
        assert!(descriptor.handler_for(Phase::Learn).is_some());
        assert!(descriptor.handler_for(Phase::Filter).is_none());
    }

    #[test]
    fn test_phases_in_pipeline_order() {
        let descriptor = PluginDescriptor::builder("p")
            .on_task(Phase::Exit, 0, noop())
            .on_task(Phase::Input, 0, noop())
            .on_task(Phase::Filter, 0, noop())
            .build();
        assert_eq!(
            descriptor.phases(),
            vec![Phase::Input, Phase::Filter, Phase::Exit]
        );
    }

    #[test]
    fn test_later_handler_replaces_earlier_for_same_phase() {
        let descriptor = PluginDescriptor::builder("p")
            .on_task(Phase::Filter, 10, noop())
            .on_task(Phase::Filter, 200, noop())
            .build();
        assert_eq!(descriptor.handler_for(Phase::Filter).unwrap().priority, 200);
    }
}
