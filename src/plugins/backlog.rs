//! Builtin `backlog` plugin: re-injects undecided entries on later runs.
//!
//! At the tail of the input phase it restores entries stored on earlier
//! runs that no input produced this time, then records a snapshot of the
//! current undecided entries so a transient input outage does not lose
//! them. The very low priority keeps it behind every real input.

use crate::entry::Entry;
use crate::errors::{HandlerError, RegistryError};
use crate::phase::Phase;
use crate::registry::{HandlerContext, HandlerResult, PluginDescriptor, PluginRegistry, TaskHandler};
use crate::task::TaskRun;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Input priority: runs after every real input plugin.
pub const BACKLOG_PRIORITY: i32 = -255;

const SNAPSHOT_NAME: &str = "backlog";

/// Stored entry fields keyed by identity, shared across runs of a task.
#[derive(Clone, Default)]
pub struct BacklogStore {
    entries: Arc<Mutex<HashMap<String, IndexMap<String, Value>>>>,
}

impl BacklogStore {
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

struct BacklogInput {
    store: BacklogStore,
}

#[async_trait]
impl TaskHandler for BacklogInput {
    async fn on_task(&self, run: &mut TaskRun, _ctx: &HandlerContext) -> HandlerResult {
        let mut store = self.store.entries.lock().map_err(HandlerError::warning)?;

        let present: Vec<String> = run.all().map(|e| e.identity_key().to_string()).collect();
        let mut restored = 0usize;
        for (key, fields) in store.iter() {
            if present.iter().any(|p| p == key) {
                continue;
            }
            let entry = Entry::from_fields(fields.clone()).map_err(HandlerError::warning)?;
            run.add_entry(entry);
            restored += 1;
        }
        if restored > 0 {
            tracing::info!(task = %run.name(), restored, "restored backlogged entries");
        }

        for entry in run.entries_mut() {
            if !entry.is_undecided() {
                continue;
            }
            entry.take_snapshot(SNAPSHOT_NAME);
            store.insert(entry.identity_key().to_string(), entry.fields().clone());
        }
        Ok(())
    }
}

/// Register the plugin against `store`.
pub fn register(registry: &mut PluginRegistry, store: BacklogStore) -> Result<(), RegistryError> {
    registry.register(
        PluginDescriptor::builder("backlog")
            .builtin()
            .interface("input")
            .schema(serde_json::json!({"type": "boolean"}))
            .on_task(Phase::Input, BACKLOG_PRIORITY, BacklogInput { store })
            .build(),
    )
}
