//! Mutable per-execution task state: the entry set, live views, and the
//! cooperative abort/rerun signals.

use crate::entry::Entry;
use crate::phase::Phase;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A warning recorded when a handler fails non-fatally.
#[derive(Debug, Clone, Serialize)]
pub struct TaskWarning {
    pub plugin: String,
    pub phase: Phase,
    pub message: String,
}

/// The working state of one task execution.
///
/// Owned exclusively by the executing task; handlers receive it by
/// mutable reference. Entries and their states persist across reruns
/// within the same execution but never across independent runs.
#[derive(Debug)]
pub struct TaskRun {
    name: String,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    entries: Vec<Entry>,
    warnings: Vec<TaskWarning>,
    current_phase: Phase,
    abort_reason: Option<String>,
    rerun_requested: bool,
    rerun_count: u32,
    max_reruns: u32,
    learn: bool,
}

impl TaskRun {
    pub fn new(name: impl Into<String>, max_reruns: u32, learn: bool) -> Self {
        Self {
            name: name.into(),
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            entries: Vec::new(),
            warnings: Vec::new(),
            current_phase: Phase::Start,
            abort_reason: None,
            rerun_requested: false,
            rerun_count: 0,
            max_reruns,
            learn,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn current_phase(&self) -> Phase {
        self.current_phase
    }

    /// Only the orchestrator advances the phase pointer.
    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.current_phase = phase;
    }

    /// In learn mode, side-effecting phases are skipped while state
    /// transitions and learn handlers still execute.
    pub fn learn_mode(&self) -> bool {
        self.learn
    }

    /// Add an entry to the task's working set.
    ///
    /// Only the `input` phase may introduce entries; an attempt from any
    /// other phase is logged and dropped.
    pub fn add_entry(&mut self, entry: Entry) {
        if !self.current_phase.introduces_entries() {
            tracing::warn!(
                task = %self.name,
                phase = %self.current_phase,
                title = entry.title(),
                "entry added outside input phase; dropping"
            );
            return;
        }
        self.entries.push(entry);
    }

    /// Every entry, in insertion order.
    pub fn all(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn accepted(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.is_accepted())
    }

    pub fn rejected(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.is_rejected())
    }

    pub fn failed(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.is_failed())
    }

    pub fn undecided(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.is_undecided())
    }

    /// Mutable access to every entry, for whole-task handlers.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries.iter_mut()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entry_mut(&mut self, index: usize) -> &mut Entry {
        &mut self.entries[index]
    }

    /// Drop later entries whose identity key duplicates an earlier one.
    /// Returns the number of entries removed.
    pub(crate) fn dedup_by_identity(&mut self) -> usize {
        let before = self.entries.len();
        let mut seen: Vec<String> = Vec::new();
        self.entries.retain(|entry| {
            let key = entry.identity_key().to_string();
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });
        before - self.entries.len()
    }

    /// Cooperatively abort the task. The first reason wins; the task
    /// short-circuits to the `abort` phase and then `exit`.
    pub fn abort(&mut self, reason: impl Into<String>) {
        if self.abort_reason.is_none() {
            let reason = reason.into();
            tracing::warn!(task = %self.name, %reason, "task aborted");
            self.abort_reason = Some(reason);
        }
    }

    pub fn aborted(&self) -> bool {
        self.abort_reason.is_some()
    }

    pub fn abort_reason(&self) -> Option<&str> {
        self.abort_reason.as_deref()
    }

    /// Request a rerun of the phase sequence from `input`. Idempotent:
    /// repeated requests within one pass do not stack.
    pub fn request_rerun(&mut self) {
        self.rerun_requested = true;
    }

    pub fn rerun_requested(&self) -> bool {
        self.rerun_requested
    }

    pub(crate) fn clear_rerun_request(&mut self) {
        self.rerun_requested = false;
    }

    pub(crate) fn increment_rerun(&mut self) {
        self.rerun_count += 1;
    }

    pub fn rerun_count(&self) -> u32 {
        self.rerun_count
    }

    pub fn max_reruns(&self) -> u32 {
        self.max_reruns
    }

    pub fn add_warning(
        &mut self,
        plugin: impl Into<String>,
        phase: Phase,
        message: impl Into<String>,
    ) {
        self.warnings.push(TaskWarning {
            plugin: plugin.into(),
            phase,
            message: message.into(),
        });
    }

    pub fn warnings(&self) -> &[TaskWarning] {
        &self.warnings
    }
}
