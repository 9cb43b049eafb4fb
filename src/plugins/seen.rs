//! Builtin `seen` plugin: cross-run duplicate suppression.
//!
//! During the filter phase it rejects undecided entries whose identity
//! key was learned on an earlier run. During the learn phase it records
//! the identity keys of every accepted entry. The high filter priority
//! makes it run before ordinary filters, so they never waste work on
//! already-handled entries.

use crate::errors::RegistryError;
use crate::phase::Phase;
use crate::registry::{
    EntryHandler, HandlerContext, HandlerResult, PluginDescriptor, PluginRegistry, TaskHandler,
};
use crate::task::TaskRun;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Filter priority: runs ahead of ordinary filters.
pub const SEEN_PRIORITY: i32 = 255;

/// Persistence seam for learned identity keys.
///
/// Implementations use interior mutability; the engine shares one store
/// across concurrent tasks.
pub trait SeenStore: Send + Sync {
    fn contains(&self, key: &str) -> bool;
    fn insert(&self, key: String);
}

/// Process-lifetime store backed by a `HashSet`.
#[derive(Default)]
pub struct MemorySeenStore {
    keys: Mutex<HashSet<String>>,
}

impl SeenStore for MemorySeenStore {
    fn contains(&self, key: &str) -> bool {
        self.keys.lock().unwrap().contains(key)
    }

    fn insert(&self, key: String) {
        self.keys.lock().unwrap().insert(key);
    }
}

struct SeenFilter {
    store: Arc<dyn SeenStore>,
}

#[async_trait]
impl EntryHandler for SeenFilter {
    async fn on_entry(&self, entry: &mut crate::entry::Entry, ctx: &HandlerContext) -> HandlerResult {
        if !entry.is_undecided() {
            return Ok(());
        }
        if self.store.contains(entry.identity_key()) {
            tracing::debug!(entry = %entry.title(), "rejecting previously seen entry");
            entry
                .reject(&ctx.plugin, "already seen on an earlier run")
                .map_err(crate::errors::HandlerError::warning)?;
        }
        Ok(())
    }
}

struct SeenLearn {
    store: Arc<dyn SeenStore>,
}

#[async_trait]
impl TaskHandler for SeenLearn {
    async fn on_task(&self, run: &mut TaskRun, _ctx: &HandlerContext) -> HandlerResult {
        let mut learned = 0usize;
        for entry in run.accepted() {
            self.store.insert(entry.identity_key().to_string());
            learned += 1;
        }
        if learned > 0 {
            tracing::debug!(task = %run.name(), learned, "learned accepted identity keys");
        }
        Ok(())
    }
}

/// Register the plugin against `store`.
pub fn register(
    registry: &mut PluginRegistry,
    store: Arc<dyn SeenStore>,
) -> Result<(), RegistryError> {
    registry.register(
        PluginDescriptor::builder("seen")
            .builtin()
            .interface("filter")
            .schema(serde_json::json!({"type": "boolean"}))
            .on_entry(
                Phase::Filter,
                SEEN_PRIORITY,
                SeenFilter {
                    store: Arc::clone(&store),
                },
            )
            .on_task(Phase::Learn, crate::registry::DEFAULT_PRIORITY, SeenLearn { store })
            .build(),
    )
}
