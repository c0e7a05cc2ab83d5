//! Calendar stores
//!
//! [`GoogleCalendarStore`](google_calendar::GoogleCalendarStore) talks to the Google Calendar API,
//! [`MemoryCalendarStore`](memory_calendar::MemoryCalendarStore) keeps everything in memory (this is mostly useful for tests).

pub mod google_calendar;
pub mod memory_calendar;

use crate::error::SyncResult;
use crate::error::SyncError;
use crate::traits::CalendarStore;

/// Make sure every calendar of `names` exists, creating the missing ones.
///
/// Returns the names of the calendars that have been created
pub async fn ensure_calendars<C, I>(store: &mut C, names: I) -> SyncResult<Vec<String>>
where
    C: CalendarStore + ?Sized,
    I: IntoIterator<Item = String>,
{
    let existing = store.list_calendars().await
        .map_err(|err| SyncError::CalendarStore(format!("unable to list calendars: {}", err)))?;

    let mut created = Vec::new();
    for name in names {
        if existing.contains(&name) || created.contains(&name) {
            continue;
        }
        log::info!("Creating calendar {}", name);
        store.create_calendar(&name).await
            .map_err(|err| SyncError::CalendarStore(format!("unable to create calendar {}: {}", name, err)))?;
        created.push(name);
    }
    Ok(created)
}
