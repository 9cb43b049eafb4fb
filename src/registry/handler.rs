//! Phase handler traits and invocation context.
//!
//! Plugins register explicit handler objects per phase instead of relying
//! on naming convention. Two handler kinds exist: `TaskHandler` receives
//! the whole task run (most filter/output plugins), while `EntryHandler`
//! is invoked once per live entry by the dispatcher (resolution-style
//! plugins). Both share the same priority ordering and error isolation.

use crate::errors::HandlerError;
use crate::entry::Entry;
use crate::phase::Phase;
use crate::task::TaskRun;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Result of one handler invocation.
pub type HandlerResult = Result<(), HandlerError>;

/// Context passed to every handler invocation.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    /// Name of the plugin being invoked. Handlers use this as the actor
    /// when changing entry state.
    pub plugin: String,
    /// The phase the handler is running in.
    pub phase: Phase,
    /// The plugin's configuration for this task (boolean shorthand or a
    /// structured value; `Null` for unconfigured builtins).
    pub config: Value,
}

/// A handler that receives the task's full live entry set.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn on_task(&self, run: &mut TaskRun, ctx: &HandlerContext) -> HandlerResult;
}

/// A handler invoked once per live (non-failed) entry by the dispatcher.
#[async_trait]
pub trait EntryHandler: Send + Sync {
    async fn on_entry(&self, entry: &mut Entry, ctx: &HandlerContext) -> HandlerResult;
}

/// A registered handler, normalized over the two invocation shapes.
#[derive(Clone)]
pub enum PhaseHandler {
    Task(Arc<dyn TaskHandler>),
    Entry(Arc<dyn EntryHandler>),
}

impl std::fmt::Debug for PhaseHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseHandler::Task(_) => f.write_str("PhaseHandler::Task"),
            PhaseHandler::Entry(_) => f.write_str("PhaseHandler::Entry"),
        }
    }
}

/// Adapter turning a plain closure into a [`TaskHandler`].
///
/// Handy for tests and small builtins that do no awaiting of their own.
pub struct TaskFn<F>(pub F);

#[async_trait]
impl<F> TaskHandler for TaskFn<F>
where
    F: Fn(&mut TaskRun, &HandlerContext) -> HandlerResult + Send + Sync,
{
    async fn on_task(&self, run: &mut TaskRun, ctx: &HandlerContext) -> HandlerResult {
        (self.0)(run, ctx)
    }
}

/// Adapter turning a plain closure into an [`EntryHandler`].
pub struct EntryFn<F>(pub F);

#[async_trait]
impl<F> EntryHandler for EntryFn<F>
where
    F: Fn(&mut Entry, &HandlerContext) -> HandlerResult + Send + Sync,
{
    async fn on_entry(&self, entry: &mut Entry, ctx: &HandlerContext) -> HandlerResult {
        (self.0)(entry, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entry_fn_adapter() {
        let handler = EntryFn(|entry: &mut Entry, ctx: &HandlerContext| {
            entry.reject(&ctx.plugin, "rejected by test")
                .map_err(HandlerError::warning)
        });
        let mut entry = Entry::new("A", "u1");
        let ctx = HandlerContext {
            plugin: "test".into(),
            phase: Phase::Filter,
            config: Value::Null,
        };
        handler.on_entry(&mut entry, &ctx).await.unwrap();
        assert!(entry.is_rejected());
        assert_eq!(entry.acted_by(), Some("test"));
    }

    #[tokio::test]
    async fn test_task_fn_adapter_propagates_errors() {
        let handler = TaskFn(|_run: &mut TaskRun, _ctx: &HandlerContext| {
            Err(HandlerError::fatal("stop everything"))
        });
        let mut run = TaskRun::new("t", 0, false);
        let ctx = HandlerContext {
            plugin: "test".into(),
            phase: Phase::Output,
            config: Value::Null,
        };
        let err = handler.on_task(&mut run, &ctx).await.unwrap_err();
        assert!(err.is_fatal());
    }
}
