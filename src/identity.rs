//! Identity bags, and matching of managed events with their source items
//!
//! Every event this crate creates carries exactly one identity bag in its private extended properties.
//! Matching only ever compares fields of this bag, never display fields (summary, description, dates),
//! since display fields are what updates change.
//!
//! Key names are part of the on-calendar format: events created by older versions must still match.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::commit::Commit;
use crate::event::Event;

pub const TASK_ID_KEY: &str = "tickTaskId";
pub const TASK_CALENDAR_KEY: &str = "calendar";
pub const TASK_COMPLETED_CALENDAR_KEY: &str = "completedCalendar";

pub const COMMIT_REPOSITORY_KEY: &str = "repository";
pub const COMMIT_DATE_KEY: &str = "commitDate";
pub const COMMIT_MESSAGE_KEY: &str = "commitMessage";
pub const COMMIT_REPOSITORY_NAME_KEY: &str = "repositoryName";
pub const COMMIT_REPOSITORY_LINK_KEY: &str = "repositoryLink";
pub const COMMIT_ID_KEY: &str = "commitId";

/// Identity of an event mirroring an ICS task
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskIdentity {
    pub tick_task_id: String,
    pub calendar: String,
    pub completed_calendar: String,
}

impl TaskIdentity {
    /// Read the bag of a task event. Returns `None` for events this crate does not manage as tasks
    pub fn from_event(event: &Event) -> Option<Self> {
        let tick_task_id = event.private_property(TASK_ID_KEY)?;
        Some(Self {
            tick_task_id: tick_task_id.to_string(),
            calendar: event.private_property(TASK_CALENDAR_KEY).unwrap_or_default().to_string(),
            completed_calendar: event.private_property(TASK_COMPLETED_CALENDAR_KEY).unwrap_or_default().to_string(),
        })
    }

    pub fn to_properties(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        props.insert(TASK_ID_KEY.to_string(), self.tick_task_id.clone());
        props.insert(TASK_CALENDAR_KEY.to_string(), self.calendar.clone());
        props.insert(TASK_COMPLETED_CALENDAR_KEY.to_string(), self.completed_calendar.clone());
        props
    }
}

/// Identity of an event mirroring a GitHub commit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitIdentity {
    pub repository: String,
    pub commit_date: String,
    pub commit_message: String,
    pub repository_name: String,
    pub repository_link: String,
    pub commit_id: String,
}

impl CommitIdentity {
    /// Read the bag of a commit event. Returns `None` for events this crate does not manage as commits
    pub fn from_event(event: &Event) -> Option<Self> {
        let repository = event.private_property(COMMIT_REPOSITORY_KEY)?;
        let commit_date = event.private_property(COMMIT_DATE_KEY)?;
        let commit_message = event.private_property(COMMIT_MESSAGE_KEY)?;
        Some(Self {
            repository: repository.to_string(),
            commit_date: commit_date.to_string(),
            commit_message: commit_message.to_string(),
            repository_name: event.private_property(COMMIT_REPOSITORY_NAME_KEY).unwrap_or_default().to_string(),
            repository_link: event.private_property(COMMIT_REPOSITORY_LINK_KEY).unwrap_or_default().to_string(),
            commit_id: event.private_property(COMMIT_ID_KEY).unwrap_or_default().to_string(),
        })
    }

    /// Build the bag of a commit. `message` is the message as it will be displayed
    pub fn from_commit(commit: &Commit, message: &str) -> Self {
        Self {
            repository: commit.repository.clone(),
            commit_date: commit.commit_date.to_rfc3339(),
            commit_message: message.to_string(),
            repository_name: commit.repository_name.clone(),
            repository_link: commit.repository_link.clone(),
            commit_id: commit.commit_id.clone(),
        }
    }

    pub fn to_properties(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        props.insert(COMMIT_REPOSITORY_KEY.to_string(), self.repository.clone());
        props.insert(COMMIT_DATE_KEY.to_string(), self.commit_date.clone());
        props.insert(COMMIT_MESSAGE_KEY.to_string(), self.commit_message.clone());
        props.insert(COMMIT_REPOSITORY_NAME_KEY.to_string(), self.repository_name.clone());
        props.insert(COMMIT_REPOSITORY_LINK_KEY.to_string(), self.repository_link.clone());
        props.insert(COMMIT_ID_KEY.to_string(), self.commit_id.clone());
        props
    }

    /// The key used by the confirmation gate. Older events may lack a `commitId`, in which case the triple is used
    pub fn key(&self) -> String {
        if self.commit_id.is_empty() {
            format!("{}@{}:{}", self.repository, self.commit_date, self.commit_message)
        } else {
            self.commit_id.clone()
        }
    }

    /// Whether this bag describes `commit`, comparing `(repository, commitDate, commitMessage)`.
    ///
    /// Messages are compared after emoji normalization on both sides, so that toggling the emoji option
    /// never produces a spurious add/delete pair.
    pub fn matches(&self, commit: &Commit) -> bool {
        self.repository == commit.repository
            && same_instant(&self.commit_date, &commit.commit_date)
            && crate::emoji::normalize(&self.commit_message) == crate::emoji::normalize(&commit.commit_message)
    }
}

fn same_instant(stored: &str, date: &DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(stored) {
        Ok(parsed) => parsed.with_timezone(&Utc) == *date,
        Err(_) => stored == date.to_rfc3339(),
    }
}

/// Find the event managing the task `task_id`, among `(calendar name, event)` pairs
pub fn find_task_event<'a>(events: &'a [(String, Event)], task_id: &str) -> Option<&'a (String, Event)> {
    events.iter().find(|(_, event)| event.private_property(TASK_ID_KEY) == Some(task_id))
}


#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use crate::event::DateSpec;

    fn commit(message: &str) -> Commit {
        Commit {
            commit_id: "abc".into(),
            commit_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            commit_message: message.into(),
            commit_url: "https://github.com/john/r/commit/abc".into(),
            repository: "john/r".into(),
            repository_name: "r".into(),
            repository_owner: "john".into(),
            repository_link: "https://github.com/john/r".into(),
            is_repository_private: false,
            is_repository_fork: false,
        }
    }

    #[test]
    fn test_commit_bag_round_trip() {
        let c = commit(":tada: release");
        let bag = CommitIdentity::from_commit(&c, "🎉 release");

        let day = DateSpec::timed(c.commit_date, None);
        let mut event = Event::new("r - 🎉 release".into(), day.clone(), day);
        event.private_properties = bag.to_properties();

        let read = CommitIdentity::from_event(&event).unwrap();
        assert_eq!(read, bag);
        assert_eq!(read.key(), "abc");
        assert!(read.matches(&c));
        assert!(TaskIdentity::from_event(&event).is_none());
    }

    #[test]
    fn test_commit_date_formats() {
        let c = commit("m");
        let mut bag = CommitIdentity::from_commit(&c, "m");
        bag.commit_date = "2024-01-01T01:00:00+01:00".into();
        assert!(bag.matches(&c));
        bag.commit_date = "2024-01-01T00:00:01Z".into();
        assert!(bag.matches(&c) == false);
    }

    #[test]
    fn test_task_bag_keys() {
        let bag = TaskIdentity {
            tick_task_id: "t1".into(),
            calendar: "Tasks".into(),
            completed_calendar: "Done".into(),
        };
        let props = bag.to_properties();
        let keys: Vec<&str> = props.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["calendar", "completedCalendar", "tickTaskId"]);
    }
}
