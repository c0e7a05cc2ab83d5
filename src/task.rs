//! Tasks, as read from an ICS feed

use serde::{Deserialize, Serialize};

use crate::event::DateSpec;

/// A task exported by a task manager ICS feed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// The `UID` of the ICS component. This is stable across renames and reschedules
    id: String,

    /// The display name of the task, as found in the feed (may still contain ICS escapes)
    name: String,

    description: Option<String>,

    start: DateSpec,
    end: DateSpec,
}

impl Task {
    pub fn new(id: String, name: String, description: Option<String>, start: DateSpec, end: DateSpec) -> Self {
        Self { id, name, description, start, end }
    }

    pub fn id(&self) -> &str               { &self.id          }
    pub fn name(&self) -> &str             { &self.name        }
    pub fn description(&self) -> Option<&str> { self.description.as_deref() }
    pub fn start(&self) -> &DateSpec       { &self.start       }
    pub fn end(&self) -> &DateSpec         { &self.end         }

    /// The name, with the ICS backslash escapes removed
    pub fn display_name(&self) -> String {
        crate::utils::unescape_ics_text(&self.name)
    }
}
