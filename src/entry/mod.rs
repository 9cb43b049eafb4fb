//! Entry: one candidate content item flowing through a task.
//!
//! An entry is an insertion-ordered mapping from field name to arbitrary
//! JSON value, plus lifecycle state. Two identity fields are mandatory:
//! `title` and `url`. An entry is owned exclusively by the task that
//! created it for the duration of one execution; plugins receive it by
//! mutable reference and mutate it in place.

mod state;

pub use state::EntryState;

use crate::errors::StateError;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Field name of the primary identity key.
pub const FIELD_URL: &str = "url";
/// Field name of the secondary identity key.
pub const FIELD_TITLE: &str = "title";

/// Error constructing an entry from raw fields.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("entry is missing required field '{field}'")]
    MissingField { field: &'static str },
}

/// One candidate content item plus its lifecycle state.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    fields: IndexMap<String, Value>,
    state: EntryState,
    state_reason: Option<String>,
    acted_by: Option<String>,
    #[serde(skip)]
    snapshots: HashMap<String, IndexMap<String, Value>>,
}

impl Entry {
    /// Create a new undecided entry with the mandatory identity fields.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(FIELD_TITLE.to_string(), Value::String(title.into()));
        fields.insert(FIELD_URL.to_string(), Value::String(url.into()));
        Self {
            fields,
            state: EntryState::Undecided,
            state_reason: None,
            acted_by: None,
            snapshots: HashMap::new(),
        }
    }

    /// Create an entry from a raw field map, validating the identity fields.
    pub fn from_fields(fields: IndexMap<String, Value>) -> Result<Self, EntryError> {
        for field in [FIELD_TITLE, FIELD_URL] {
            match fields.get(field) {
                Some(Value::String(s)) if !s.is_empty() => {}
                _ => return Err(EntryError::MissingField { field }),
            }
        }
        Ok(Self {
            fields,
            state: EntryState::Undecided,
            state_reason: None,
            acted_by: None,
            snapshots: HashMap::new(),
        })
    }

    pub fn title(&self) -> &str {
        self.str_field(FIELD_TITLE).unwrap_or_default()
    }

    pub fn url(&self) -> &str {
        self.str_field(FIELD_URL).unwrap_or_default()
    }

    /// The key entries are deduplicated by: `url`, falling back to `title`.
    pub fn identity_key(&self) -> &str {
        match self.str_field(FIELD_URL) {
            Some(url) if !url.is_empty() => url,
            _ => self.title(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// The full field map, in insertion order.
    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn state_reason(&self) -> Option<&str> {
        self.state_reason.as_deref()
    }

    /// Name of the plugin that last changed this entry's state.
    pub fn acted_by(&self) -> Option<&str> {
        self.acted_by.as_deref()
    }

    pub fn is_undecided(&self) -> bool {
        self.state == EntryState::Undecided
    }

    pub fn is_accepted(&self) -> bool {
        self.state == EntryState::Accepted
    }

    pub fn is_rejected(&self) -> bool {
        self.state == EntryState::Rejected
    }

    pub fn is_failed(&self) -> bool {
        self.state == EntryState::Failed
    }

    /// Transition the entry to `next`, recording the acting plugin and reason.
    ///
    /// `Accepted` and `Rejected` are terminal: leaving them requires
    /// `force`, except for `Failed`, which may be entered from any state.
    /// Rejecting or failing requires a non-empty reason.
    pub fn set_state(
        &mut self,
        next: EntryState,
        actor: &str,
        reason: Option<&str>,
        force: bool,
    ) -> Result<(), StateError> {
        if next.requires_reason() && reason.map(str::trim).unwrap_or_default().is_empty() {
            return Err(StateError::MissingReason { target: next });
        }
        if self.state.is_terminal() && next != EntryState::Failed && !force {
            return Err(StateError::AlreadyDecided {
                current: self.state,
                acted_by: self.acted_by.clone().unwrap_or_default(),
            });
        }
        self.state = next;
        self.state_reason = reason.map(str::to_string);
        self.acted_by = Some(actor.to_string());
        Ok(())
    }

    pub fn accept(&mut self, actor: &str, reason: Option<&str>) -> Result<(), StateError> {
        self.set_state(EntryState::Accepted, actor, reason, false)
    }

    pub fn reject(&mut self, actor: &str, reason: &str) -> Result<(), StateError> {
        self.set_state(EntryState::Rejected, actor, Some(reason), false)
    }

    pub fn fail(&mut self, actor: &str, reason: &str) -> Result<(), StateError> {
        self.set_state(EntryState::Failed, actor, Some(reason), false)
    }

    /// Take an immutable deep copy of the field map under `name`.
    ///
    /// Returns `false` without overwriting when a snapshot with that name
    /// already exists.
    pub fn take_snapshot(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.snapshots.contains_key(&name) {
            return false;
        }
        self.snapshots.insert(name, self.fields.clone());
        true
    }

    /// Retrieve a previously taken snapshot by name.
    pub fn snapshot(&self, name: &str) -> Option<&IndexMap<String, Value>> {
        self.snapshots.get(name)
    }

    pub fn snapshot_names(&self) -> Vec<&str> {
        self.snapshots.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_entry_is_undecided() {
        let entry = Entry::new("A", "http://example.com/a");
        assert_eq!(entry.state(), EntryState::Undecided);
        assert_eq!(entry.title(), "A");
        assert_eq!(entry.url(), "http://example.com/a");
        assert!(entry.acted_by().is_none());
    }

    #[test]
    fn test_from_fields_requires_identity() {
        let mut fields = IndexMap::new();
        fields.insert("title".to_string(), json!("A"));
        let err = Entry::from_fields(fields.clone()).unwrap_err();
        assert!(matches!(err, EntryError::MissingField { field: "url" }));

        fields.insert("url".to_string(), json!("http://example.com/a"));
        assert!(Entry::from_fields(fields).is_ok());
    }

    #[test]
    fn test_identity_key_falls_back_to_title() {
        let entry = Entry::new("A", "http://example.com/a");
        assert_eq!(entry.identity_key(), "http://example.com/a");

        let entry = Entry::new("only-title", "");
        assert_eq!(entry.identity_key(), "only-title");
    }

    #[test]
    fn test_accept_records_actor_and_reason() {
        let mut entry = Entry::new("A", "u1");
        entry.accept("accept_all", Some("matched")).unwrap();
        assert!(entry.is_accepted());
        assert_eq!(entry.acted_by(), Some("accept_all"));
        assert_eq!(entry.state_reason(), Some("matched"));
    }

    #[test]
    fn test_reject_after_accept_is_refused_without_force() {
        let mut entry = Entry::new("A", "u1");
        entry.accept("first", None).unwrap();

        let err = entry.reject("second", "too small").unwrap_err();
        match err {
            StateError::AlreadyDecided { current, acted_by } => {
                assert_eq!(current, EntryState::Accepted);
                assert_eq!(acted_by, "first");
            }
            other => panic!("Expected AlreadyDecided, got {other:?}"),
        }
        // State unchanged by the refused transition.
        assert!(entry.is_accepted());
        assert_eq!(entry.acted_by(), Some("first"));
    }

    #[test]
    fn test_force_overrides_terminal_state() {
        let mut entry = Entry::new("A", "u1");
        entry.reject("first", "nope").unwrap();
        entry
            .set_state(EntryState::Accepted, "second", Some("override"), true)
            .unwrap();
        assert!(entry.is_accepted());
        assert_eq!(entry.acted_by(), Some("second"));
    }

    #[test]
    fn test_failed_reachable_from_any_state() {
        let mut entry = Entry::new("A", "u1");
        entry.accept("first", None).unwrap();
        entry.fail("downloader", "connection refused").unwrap();
        assert!(entry.is_failed());
        assert_eq!(entry.state_reason(), Some("connection refused"));
    }

    #[test]
    fn test_reject_requires_reason() {
        let mut entry = Entry::new("A", "u1");
        let err = entry
            .set_state(EntryState::Rejected, "p", Some("  "), false)
            .unwrap_err();
        assert!(matches!(
            err,
            StateError::MissingReason {
                target: EntryState::Rejected
            }
        ));
        assert!(entry.is_undecided());
    }

    #[test]
    fn test_snapshot_is_immutable_copy() {
        let mut entry = Entry::new("A", "u1");
        entry.set("quality", json!("720p"));
        assert!(entry.take_snapshot("after_input"));

        entry.set("quality", json!("1080p"));
        let snap = entry.snapshot("after_input").unwrap();
        assert_eq!(snap.get("quality"), Some(&json!("720p")));
        assert_eq!(entry.get("quality"), Some(&json!("1080p")));
    }

    #[test]
    fn test_snapshot_does_not_overwrite() {
        let mut entry = Entry::new("A", "u1");
        assert!(entry.take_snapshot("s"));
        entry.set("extra", json!(1));
        assert!(!entry.take_snapshot("s"));
        assert!(entry.snapshot("s").unwrap().get("extra").is_none());
    }
}
