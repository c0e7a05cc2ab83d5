//! What happened during a sync invocation
//!
//! These figures are only used for reporting. No decision ever depends on the stats of a previous run.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// An event that has been created, changed or moved during a run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub calendar: String,
    pub summary: String,
}

impl EventRecord {
    pub fn new(calendar: &str, summary: &str) -> Self {
        Self { calendar: calendar.to_string(), summary: summary.to_string() }
    }
}

/// An error that has been reported without aborting the whole run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: String,
    pub message: String,
}

impl From<&SyncError> for ErrorRecord {
    fn from(err: &SyncError) -> Self {
        Self { kind: err.kind().to_string(), message: err.to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub added_tasks: Vec<EventRecord>,
    #[serde(default)]
    pub updated_tasks: Vec<EventRecord>,
    #[serde(default)]
    pub completed_tasks: Vec<EventRecord>,

    #[serde(default)]
    pub added_commits: Vec<EventRecord>,
    #[serde(default)]
    pub deleted_commits: Vec<EventRecord>,

    /// Current step of the commit confirmation cycle, once the commit engine has run
    #[serde(default)]
    pub commit_confirmation_count: Option<u32>,

    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
}

impl SessionStats {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            added_tasks: Vec::new(),
            updated_tasks: Vec::new(),
            completed_tasks: Vec::new(),
            added_commits: Vec::new(),
            deleted_commits: Vec::new(),
            commit_confirmation_count: None,
            errors: Vec::new(),
        }
    }

    /// The number of calendar mutations this run performed
    pub fn n_changes(&self) -> usize {
        self.added_tasks.len() + self.updated_tasks.len() + self.completed_tasks.len()
            + self.added_commits.len() + self.deleted_commits.len()
    }

    pub fn has_errors(&self) -> bool {
        self.errors.is_empty() == false
    }
}

impl Display for SessionStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "tasks: {} added, {} updated, {} completed; commits: {} added, {} deleted",
            self.added_tasks.len(), self.updated_tasks.len(), self.completed_tasks.len(),
            self.added_commits.len(), self.deleted_commits.len())?;
        if let Some(count) = self.commit_confirmation_count {
            write!(f, " (confirmation step {})", count)?;
        }
        if self.has_errors() {
            write!(f, "; {} error(s)", self.errors.len())?;
        }
        Ok(())
    }
}
