//! Task configuration and the external validation boundary.
//!
//! The engine is handed an already-parsed mapping from plugin name to
//! plugin-specific configuration (or boolean shorthand) and a `disable`
//! list. Parsing and include resolution happen upstream; schema
//! validation is delegated to a [`ConfigValidator`] implementation whose
//! errors the resolver surfaces as-is.

use crate::errors::ConfigError;
use crate::registry::PluginDescriptor;
use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Literal accepted in `disable` to remove every builtin-flagged plugin.
pub const DISABLE_BUILTINS: &str = "builtins";

fn default_max_reruns() -> u32 {
    5
}

/// Configuration for one task.
///
/// Any key other than `disable` and `max_reruns` names a plugin and
/// carries its configuration value. `true` is shorthand for "enabled
/// with defaults"; `false` disables the plugin like listing it in
/// `disable` would.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Plugin names (or the literal `builtins`) excluded from this task.
    #[serde(default)]
    pub disable: Vec<String>,

    /// Upper bound on reruns within one execution; `0` disables reruns.
    #[serde(default = "default_max_reruns")]
    pub max_reruns: u32,

    /// Plugin name to configuration value, in declaration order.
    #[serde(flatten)]
    pub plugins: IndexMap<String, Value>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            disable: Vec::new(),
            max_reruns: default_max_reruns(),
            plugins: IndexMap::new(),
        }
    }
}

impl TaskConfig {
    /// Configure a plugin, builder style.
    pub fn with_plugin(mut self, name: impl Into<String>, config: Value) -> Self {
        self.plugins.insert(name.into(), config);
        self
    }

    /// Add a name to the disable list, builder style.
    pub fn with_disabled(mut self, name: impl Into<String>) -> Self {
        self.disable.push(name.into());
        self
    }

    pub fn with_max_reruns(mut self, max_reruns: u32) -> Self {
        self.max_reruns = max_reruns;
        self
    }

    /// Whether `name` (or all builtins, when `builtin` is set) is disabled.
    pub fn is_disabled(&self, name: &str, builtin: bool) -> bool {
        if builtin && self.disable.iter().any(|d| d == DISABLE_BUILTINS) {
            return true;
        }
        if self.disable.iter().any(|d| d == name) {
            return true;
        }
        // `plugin: false` is shorthand for disabling.
        matches!(self.plugins.get(name), Some(Value::Bool(false)))
    }
}

/// A file of named task configurations, loaded by the CLI boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasksFile {
    #[serde(default)]
    pub tasks: IndexMap<String, TaskConfig>,
}

impl TasksFile {
    /// Load task configurations from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tasks file: {}", path.display()))?;
        let file: TasksFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse tasks YAML: {}", path.display()))?;
        Ok(file)
    }
}

/// The external schema-validator seam.
///
/// The engine does not define a validation language; it hands each
/// configured plugin's declared schema and config value to a validator
/// before resolution and surfaces its error verbatim.
pub trait ConfigValidator: Send + Sync {
    fn validate(&self, plugin: &PluginDescriptor, config: &Value) -> Result<(), ConfigError>;
}

/// Pass-through validator used when no external validator is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllValidator;

impl ConfigValidator for AcceptAllValidator {
    fn validate(&self, _plugin: &PluginDescriptor, _config: &Value) -> Result<(), ConfigError> {
        Ok(())
    }
}
