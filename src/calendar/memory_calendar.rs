use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::BoxError;
use crate::event::{Event, EventPatch};
use crate::mock_behaviour::MockBehaviour;
use crate::traits::CalendarStore;

/// A mutating call received by a [`MemoryCalendarStore`]
#[derive(Clone, Debug, PartialEq)]
pub enum StoreCall {
    CreateCalendar(String),
    Insert { calendar: String, event_id: String },
    Update { calendar: String, event_id: String },
    Move { from: String, to: String, event_id: String },
    Delete { calendar: String, event_id: String },
}

/// A calendar store that lives in memory.
///
/// It records every mutating call, and can be told to fail some of them with a [`MockBehaviour`]
#[derive(Debug, Default)]
pub struct MemoryCalendarStore {
    calendars: BTreeMap<String, Vec<Event>>,
    calls: Vec<StoreCall>,
    mock_behaviour: MockBehaviour,
}

impl MemoryCalendarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already contains these (empty) calendars
    pub fn with_calendars<S: ToString>(names: &[S]) -> Self {
        let mut store = Self::new();
        for name in names {
            store.calendars.insert(name.to_string(), Vec::new());
        }
        store
    }

    pub fn set_mock_behaviour(&mut self, behaviour: MockBehaviour) {
        self.mock_behaviour = behaviour;
    }

    /// Add an event without going through the [`CalendarStore`] API (no call recorded, no mock behaviour).
    /// The calendar is created if needed. Returns the id of the event
    pub fn seed_event(&mut self, calendar: &str, mut event: Event) -> String {
        if event.id.is_empty() {
            event.id = random_id();
        }
        let id = event.id.clone();
        self.calendars.entry(calendar.to_string()).or_default().push(event);
        id
    }

    /// The events of a calendar (empty if the calendar does not exist)
    pub fn events(&self, calendar: &str) -> &[Event] {
        self.calendars.get(calendar).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The number of events, across every calendar
    pub fn total_event_count(&self) -> usize {
        self.calendars.values().map(|events| events.len()).sum()
    }

    pub fn calendar_names(&self) -> Vec<&str> {
        self.calendars.keys().map(|k| k.as_str()).collect()
    }

    /// Every mutating call received since the creation of the store (or the last [`Self::clear_calls`])
    pub fn calls(&self) -> &[StoreCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn calendar_mut(&mut self, calendar: &str) -> Result<&mut Vec<Event>, BoxError> {
        self.calendars.get_mut(calendar)
            .ok_or_else(|| format!("No calendar named {}", calendar).into())
    }

    fn take_event(&mut self, calendar: &str, event_id: &str) -> Result<Event, BoxError> {
        let events = self.calendar_mut(calendar)?;
        match events.iter().position(|e| e.id == event_id) {
            None => Err(format!("No event {} in calendar {}", event_id, calendar).into()),
            Some(index) => Ok(events.remove(index)),
        }
    }
}

#[async_trait]
impl CalendarStore for MemoryCalendarStore {
    async fn list_calendars(&mut self) -> Result<Vec<String>, BoxError> {
        self.mock_behaviour.can_list_calendars()?;
        Ok(self.calendars.keys().cloned().collect())
    }

    async fn create_calendar(&mut self, name: &str) -> Result<(), BoxError> {
        self.mock_behaviour.can_create_calendar()?;
        if self.calendars.contains_key(name) {
            return Err(format!("A calendar named {} already exists", name).into());
        }
        self.calendars.insert(name.to_string(), Vec::new());
        self.calls.push(StoreCall::CreateCalendar(name.to_string()));
        Ok(())
    }

    async fn list_events(&mut self, calendar: &str) -> Result<Vec<Event>, BoxError> {
        self.mock_behaviour.can_list_events()?;
        Ok(self.calendar_mut(calendar)?.clone())
    }

    async fn insert_event(&mut self, calendar: &str, mut event: Event) -> Result<Event, BoxError> {
        self.mock_behaviour.can_insert_event()?;
        event.id = random_id();
        self.calendar_mut(calendar)?.push(event.clone());
        self.calls.push(StoreCall::Insert { calendar: calendar.to_string(), event_id: event.id.clone() });
        Ok(event)
    }

    async fn update_event(&mut self, calendar: &str, event_id: &str, patch: EventPatch) -> Result<Event, BoxError> {
        self.mock_behaviour.can_update_event()?;
        let events = self.calendar_mut(calendar)?;
        let event = match events.iter_mut().find(|e| e.id == event_id) {
            None => return Err(format!("No event {} in calendar {}", event_id, calendar).into()),
            Some(e) => e,
        };
        event.apply(&patch);
        let updated = event.clone();
        self.calls.push(StoreCall::Update { calendar: calendar.to_string(), event_id: event_id.to_string() });
        Ok(updated)
    }

    async fn move_event(&mut self, from_calendar: &str, event_id: &str, to_calendar: &str) -> Result<Event, BoxError> {
        self.mock_behaviour.can_move_event()?;
        if self.calendars.contains_key(to_calendar) == false {
            return Err(format!("No calendar named {}", to_calendar).into());
        }
        let event = self.take_event(from_calendar, event_id)?;
        self.calendar_mut(to_calendar)?.push(event.clone());
        self.calls.push(StoreCall::Move {
            from: from_calendar.to_string(),
            to: to_calendar.to_string(),
            event_id: event_id.to_string(),
        });
        Ok(event)
    }

    async fn delete_event(&mut self, calendar: &str, event_id: &str) -> Result<(), BoxError> {
        self.mock_behaviour.can_delete_event()?;
        self.take_event(calendar, event_id)?;
        self.calls.push(StoreCall::Delete { calendar: calendar.to_string(), event_id: event_id.to_string() });
        Ok(())
    }
}

fn random_id() -> String {
    uuid::Uuid::new_v4().to_simple().to_string()
}


#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;
    use crate::event::DateSpec;

    fn event(summary: &str) -> Event {
        let day = DateSpec::all_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        Event::new(summary.to_string(), day.clone(), day)
    }

    #[tokio::test]
    async fn test_move_keeps_event() {
        let mut store = MemoryCalendarStore::with_calendars(&["Tasks", "Done"]);
        let inserted = store.insert_event("Tasks", event("Buy milk")).await.unwrap();
        assert_eq!(store.total_event_count(), 1);

        let moved = store.move_event("Tasks", &inserted.id, "Done").await.unwrap();
        assert_eq!(moved.id, inserted.id);
        assert!(store.events("Tasks").is_empty());
        assert_eq!(store.events("Done").len(), 1);
        assert_eq!(store.total_event_count(), 1);
        assert_eq!(store.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_create_existing_calendar_fails() {
        let mut store = MemoryCalendarStore::with_calendars(&["Tasks"]);
        assert!(store.create_calendar("Tasks").await.is_err());
        assert!(store.create_calendar("Done").await.is_ok());
        assert_eq!(store.calendar_names(), vec!["Done", "Tasks"]);
    }

    #[tokio::test]
    async fn test_mocked_failures() {
        let mut store = MemoryCalendarStore::with_calendars(&["Tasks"]);
        store.set_mock_behaviour(MockBehaviour { insert_event_behaviour: (1, 1), ..MockBehaviour::default() });
        assert!(store.insert_event("Tasks", event("a")).await.is_ok());
        assert!(store.insert_event("Tasks", event("b")).await.is_err());
        assert!(store.insert_event("Tasks", event("c")).await.is_ok());
        assert_eq!(store.events("Tasks").len(), 2);
    }
}
