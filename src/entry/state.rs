//! Entry lifecycle states and transition rules.

use serde::{Deserialize, Serialize};

/// The lifecycle state of one entry within a task run.
///
/// `Accepted` and `Rejected` are terminal by default: a second plain
/// transition out of them is refused unless the caller passes `force`.
/// `Failed` may be entered from any state and excludes the entry from
/// further phase processing while keeping it for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    #[default]
    Undecided,
    Accepted,
    Rejected,
    Failed,
}

impl EntryState {
    /// Whether a plain transition out of this state is refused.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryState::Accepted | EntryState::Rejected)
    }

    /// Whether this state requires a non-empty reason to enter.
    pub fn requires_reason(&self) -> bool {
        matches!(self, EntryState::Rejected | EntryState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Undecided => "undecided",
            EntryState::Accepted => "accepted",
            EntryState::Rejected => "rejected",
            EntryState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for EntryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
