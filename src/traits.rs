//! The collaborators a sync invocation relies on
//!
//! Reconcilers only ever talk to these traits, so that they can run against Google Calendar, GitHub and
//! real ICS feeds, or against in-memory fakes in tests.

use async_trait::async_trait;
use serde_json::Value;

use crate::commit::Commit;
use crate::error::BoxError;
use crate::event::{Event, EventPatch};
use crate::task::Task;

/// A set of named calendars, and their events
#[async_trait]
pub trait CalendarStore: Send {
    /// Returns the names of the calendars the user owns
    async fn list_calendars(&mut self) -> Result<Vec<String>, BoxError>;
    /// Create a calendar. This fails if the user already owns a calendar with this name
    async fn create_calendar(&mut self, name: &str) -> Result<(), BoxError>;

    /// Returns every event of a calendar
    async fn list_events(&mut self, calendar: &str) -> Result<Vec<Event>, BoxError>;
    /// Insert a new event. The returned event carries its newly assigned id
    async fn insert_event(&mut self, calendar: &str, event: Event) -> Result<Event, BoxError>;
    /// Patch an existing event
    async fn update_event(&mut self, calendar: &str, event_id: &str, patch: EventPatch) -> Result<Event, BoxError>;
    /// Move an event to another calendar. The event keeps its content and private properties
    async fn move_event(&mut self, from_calendar: &str, event_id: &str, to_calendar: &str) -> Result<Event, BoxError>;
    /// Delete an event
    async fn delete_event(&mut self, calendar: &str, event_id: &str) -> Result<(), BoxError>;
}

/// A durable string -> JSON map, that survives across invocations.
///
/// There are no transactions: every `set` is a plain overwrite.
pub trait PropertyStore: Send {
    fn get(&self, key: &str) -> Result<Option<Value>, BoxError>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), BoxError>;
    fn delete(&mut self, key: &str) -> Result<(), BoxError>;
    fn list_keys(&self) -> Result<Vec<String>, BoxError>;
}

/// Something that reads tasks from an ICS link
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Fetch and parse the feed at `link`.
    ///
    /// Fails with [`UpstreamError::InvalidLink`](crate::error::UpstreamError::InvalidLink) or
    /// [`UpstreamError::MalformedCalendar`](crate::error::UpstreamError::MalformedCalendar)
    async fn fetch_tasks(&self, link: &str) -> Result<Vec<Task>, BoxError>;
}

/// Something that lists the commits of a user
#[async_trait]
pub trait CommitSource: Send + Sync {
    /// Fails with [`UpstreamError::InvalidUsername`](crate::error::UpstreamError::InvalidUsername) or
    /// [`UpstreamError::InvalidToken`](crate::error::UpstreamError::InvalidToken)
    async fn fetch_commits(&self, username: &str, token: Option<&str>) -> Result<Vec<Commit>, BoxError>;
}
