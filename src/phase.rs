//! Phase definitions for the trawler task engine.
//!
//! A task executes its plugins over a fixed, ordered sequence of phases.
//! Only the `input` phase may introduce new entries into a task; every
//! later phase mutates the entries that already exist. The `abort` phase
//! is outside the normal sequence and runs only when a task aborts,
//! immediately followed by `exit`.

use serde::{Deserialize, Serialize};

/// A named stage in the fixed pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// One-time setup before the first pass.
    Start,
    /// The only phase allowed to add entries to the task.
    Input,
    /// Enrich entries with metadata before filtering.
    Metainfo,
    /// Accept or reject entries.
    Filter,
    /// Fetch content for accepted entries.
    Download,
    /// Adjust entry fields after download.
    Modify,
    /// Produce side effects for accepted entries.
    Output,
    /// Record outcomes (e.g. remember seen entries).
    Learn,
    /// Always runs last, even after an abort.
    Exit,
    /// Runs only when the task aborts, before `exit`.
    Abort,
}

impl Phase {
    /// The per-pass phase order, `input` through `learn`.
    ///
    /// `start` runs once before the first pass, and `exit` (plus `abort`
    /// when triggered) runs after the rerun decision; neither repeats on
    /// rerun, so neither appears here.
    pub fn sequence() -> &'static [Phase] {
        &[
            Phase::Input,
            Phase::Metainfo,
            Phase::Filter,
            Phase::Download,
            Phase::Modify,
            Phase::Output,
            Phase::Learn,
        ]
    }

    /// Every phase a plugin may register a handler for.
    pub fn all() -> &'static [Phase] {
        &[
            Phase::Start,
            Phase::Input,
            Phase::Metainfo,
            Phase::Filter,
            Phase::Download,
            Phase::Modify,
            Phase::Output,
            Phase::Learn,
            Phase::Exit,
            Phase::Abort,
        ]
    }

    /// Whether entries may be added to the task during this phase.
    pub fn introduces_entries(&self) -> bool {
        matches!(self, Phase::Input)
    }

    /// Returns the phase name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::Input => "input",
            Phase::Metainfo => "metainfo",
            Phase::Filter => "filter",
            Phase::Download => "download",
            Phase::Modify => "modify",
            Phase::Output => "output",
            Phase::Learn => "learn",
            Phase::Exit => "exit",
            Phase::Abort => "abort",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start" => Ok(Phase::Start),
            "input" => Ok(Phase::Input),
            "metainfo" => Ok(Phase::Metainfo),
            "filter" => Ok(Phase::Filter),
            "download" => Ok(Phase::Download),
            "modify" => Ok(Phase::Modify),
            "output" => Ok(Phase::Output),
            "learn" => Ok(Phase::Learn),
            "exit" => Ok(Phase::Exit),
            "abort" => Ok(Phase::Abort),
            _ => anyhow::bail!(
                "Invalid phase '{}'. Valid values: start, input, metainfo, filter, download, modify, output, learn, exit, abort",
                s
            ),
        }
    }
}
