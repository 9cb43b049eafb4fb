//! Typed error hierarchy for the trawler engine.
//!
//! One top-level enum per subsystem:
//! - `RegistryError` — plugin registration and lookup failures
//! - `ConfigError` — task resolution and config validation failures
//! - `StateError` — invalid entry state transitions
//! - `HandlerError` — failures raised inside plugin handlers
//! - `TaskError` — task-level execution failures
//!
//! Registry and config errors are fatal before any phase runs. Handler
//! errors are recovered at the dispatcher boundary: a `Warning` is logged
//! and execution continues, while `Fatal` aborts the task. Rejecting or
//! failing an entry is never an error.

use crate::entry::EntryState;
use thiserror::Error;

/// Errors from the process-wide plugin registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("plugin '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("invalid descriptor for plugin '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },

    #[error("unknown plugin '{name}'")]
    UnknownPlugin { name: String },
}

/// Errors surfaced while resolving a task's configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("task '{task}' configures unknown plugin '{plugin}'")]
    UnknownPlugin { task: String, plugin: String },

    #[error("invalid configuration for plugin '{plugin}': {message}")]
    Invalid { plugin: String, message: String },

    #[error("failed to load task configuration: {0}")]
    Load(#[from] anyhow::Error),
}

/// Errors from entry state transitions.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("entry already {current} by '{acted_by}'; a second transition requires force")]
    AlreadyDecided {
        current: EntryState,
        acted_by: String,
    },

    #[error("a non-empty reason is required when marking an entry {target}")]
    MissingReason { target: EntryState },
}

/// A failure raised inside a plugin handler.
///
/// `Warning` is caught by the dispatcher, logged with plugin and phase
/// context, and recorded on the task; the phase continues with the next
/// handler. `Fatal` sets the task abort flag and stops the remaining
/// handlers of the current phase.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Warning(#[from] anyhow::Error),

    #[error("{reason}")]
    Fatal { reason: String },
}

impl HandlerError {
    /// Create a non-fatal warning from any displayable message.
    pub fn warning(message: impl std::fmt::Display) -> Self {
        HandlerError::Warning(anyhow::anyhow!("{message}"))
    }

    /// Create a fatal error that aborts the task.
    pub fn fatal(reason: impl Into<String>) -> Self {
        HandlerError::Fatal {
            reason: reason.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, HandlerError::Fatal { .. })
    }
}

/// Errors from executing a task.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("task '{task}' panicked during execution")]
    Panicked { task: String },
}
