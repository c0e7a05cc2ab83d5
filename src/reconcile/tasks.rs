use std::collections::{BTreeSet, HashSet};

use crate::config::IcsSourceConfig;
use crate::content::{task_event, task_event_differs};
use crate::error::{SyncError, SyncResult};
use crate::event::{Event, EventPatch};
use crate::identity::{find_task_event, TaskIdentity};
use crate::provider::run_context::RunContext;
use crate::provider::session_stats::EventRecord;
use crate::provider::sync_progress::SyncSource;
use crate::task::Task;
use crate::traits::{CalendarStore, TaskSource};

/// Mirror the configured ICS feeds into their calendars.
///
/// Tasks are matched with their events by id only. Tasks that disappeared from every feed are moved
/// to their completed calendar, they are never deleted.
pub async fn sync_tasks<C, S>(ctx: &mut RunContext<'_>, store: &mut C, reader: &S) -> SyncResult<()>
where
    C: CalendarStore + ?Sized,
    S: TaskSource + ?Sized,
{
    let config = ctx.config;
    ctx.progress.start_source(SyncSource::TaskFeeds, format!("reading {} feeds", config.ics_calendars.len()));

    let fetched = fetch_all_sources(ctx, reader, &config.ics_calendars).await?;

    let mut events = list_managed_events(store, &config.ics_calendars).await?;
    ctx.progress.debug(&format!("{} managed task events found", events.len()));

    let mut seen_ids = HashSet::new();
    for (source, tasks) in &fetched.sources {
        ctx.progress.start_source(source.sync_source(), format!("reconciling {} tasks", tasks.len()));
        for task in tasks {
            seen_ids.insert(task.id().to_string());
            reconcile_task(ctx, store, &mut events, source, task).await?;
        }
    }

    if fetched.complete == false {
        ctx.progress.warn("Some feeds could not be read, not looking for completed tasks this time");
        return Ok(());
    }
    complete_missing_tasks(ctx, store, &events, &seen_ids).await
}


struct FetchedSources<'a> {
    /// Sources that have been read, tagged ones first, and their tasks
    sources: Vec<(&'a IcsSourceConfig, Vec<Task>)>,
    /// Whether every source could be read
    complete: bool,
}

async fn fetch_all_sources<'a, S>(ctx: &mut RunContext<'_>, reader: &S, sources: &'a [IcsSourceConfig]) -> SyncResult<FetchedSources<'a>>
where
    S: TaskSource + ?Sized,
{
    let (tagged, others): (Vec<&IcsSourceConfig>, Vec<&IcsSourceConfig>) = sources.iter().partition(|s| s.tag.is_some());

    let mut fetched = FetchedSources { sources: Vec::new(), complete: true };
    let mut failed_tags = BTreeSet::new();

    for source in tagged.into_iter().chain(others.into_iter()) {
        if let Some(tag) = source.ignored_tags.iter().find(|tag| failed_tags.contains(*tag)) {
            ctx.progress.warn(&format!("Skipping {}, since the feed tagged '{}' could not be read", source.descr(), tag));
            fetched.complete = false;
            continue;
        }

        let mut tasks = match reader.fetch_tasks(&source.link).await {
            Ok(tasks) => tasks,
            Err(err) => {
                let err = SyncError::upstream(&source.descr(), err);
                if err.is_source_local() == false {
                    return Err(err);
                }
                ctx.record_error(&err);
                fetched.complete = false;
                if let Some(tag) = &source.tag {
                    failed_tags.insert(tag.clone());
                }
                continue;
            },
        };
        ctx.progress.debug(&format!("{}: {} tasks", source.descr(), tasks.len()));

        for ignored_tag in &source.ignored_tags {
            let claimed: HashSet<&str> = fetched.sources.iter()
                .filter(|(s, _)| s.tag.as_ref() == Some(ignored_tag))
                .flat_map(|(_, tasks)| tasks.iter().map(|t| t.id()))
                .collect();
            let before = tasks.len();
            tasks.retain(|task| claimed.contains(task.id()) == false);
            ctx.progress.trace(&format!("{}: {} tasks already claimed by '{}'", source.descr(), before - tasks.len(), ignored_tag));
        }

        fetched.sources.push((source, tasks));
    }

    Ok(fetched)
}

/// Every managed task event in the target calendars, along with the calendar it lives in
async fn list_managed_events<C>(store: &mut C, sources: &[IcsSourceConfig]) -> SyncResult<Vec<(String, Event)>>
where
    C: CalendarStore + ?Sized,
{
    let calendars: BTreeSet<&str> = sources.iter().map(|s| s.calendar.as_str()).collect();

    let mut events = Vec::new();
    for calendar in calendars {
        let listed = store.list_events(calendar).await
            .map_err(|err| SyncError::CalendarStore(format!("unable to list the events of {}: {}", calendar, err)))?;
        events.extend(listed.into_iter()
            .filter(|event| TaskIdentity::from_event(event).is_some())
            .map(|event| (calendar.to_string(), event)));
    }
    Ok(events)
}

async fn reconcile_task<C>(ctx: &mut RunContext<'_>, store: &mut C, events: &mut Vec<(String, Event)>, source: &IcsSourceConfig, task: &Task) -> SyncResult<()>
where
    C: CalendarStore + ?Sized,
{
    let desired = task_event(task, source);
    let target = source.calendar.as_str();

    let (current_calendar, current) = match find_task_event(&events[..], task.id()) {
        Some((calendar, event)) => (calendar.clone(), event.clone()),
        None => {
            ctx.progress.debug(&format!("Adding task {} ({}) to {}", task.id(), desired.summary, target));
            let inserted = store.insert_event(target, desired).await
                .map_err(|err| SyncError::mutation("insert", target, err))?;
            ctx.stats.added_tasks.push(EventRecord::new(target, &inserted.summary));
            events.push((target.to_string(), inserted));
            return Ok(());
        },
    };

    let updated = if current_calendar != target {
        ctx.progress.debug(&format!("Moving task {} ({}) from {} to {}", task.id(), desired.summary, current_calendar, target));
        store.move_event(&current_calendar, &current.id, target).await
            .map_err(|err| SyncError::mutation("move", &current_calendar, err))?;
        store.update_event(target, &current.id, EventPatch::from_event(&desired)).await
            .map_err(|err| SyncError::mutation("update", target, err))?
    } else if task_event_differs(&current, &desired) {
        ctx.progress.debug(&format!("Updating task {} ({})", task.id(), desired.summary));
        store.update_event(target, &current.id, EventPatch::from_event(&desired)).await
            .map_err(|err| SyncError::mutation("update", target, err))?
    } else {
        return Ok(());
    };

    ctx.stats.updated_tasks.push(EventRecord::new(target, &updated.summary));
    if let Some(entry) = events.iter_mut().find(|(_, event)| event.id == current.id) {
        *entry = (target.to_string(), updated);
    }
    Ok(())
}

async fn complete_missing_tasks<C>(ctx: &mut RunContext<'_>, store: &mut C, events: &[(String, Event)], seen_ids: &HashSet<String>) -> SyncResult<()>
where
    C: CalendarStore + ?Sized,
{
    for (calendar, event) in events {
        let identity = match TaskIdentity::from_event(event) {
            Some(identity) => identity,
            None => continue,
        };
        if seen_ids.contains(&identity.tick_task_id) {
            continue;
        }
        if identity.completed_calendar.is_empty() {
            ctx.progress.warn(&format!("Task event {} ({}) has no completed calendar, leaving it in {}", event.id, event.summary, calendar));
            continue;
        }
        if &identity.completed_calendar == calendar {
            continue;
        }

        ctx.progress.debug(&format!("Task {} ({}) is completed", identity.tick_task_id, event.summary));
        store.move_event(calendar, &event.id, &identity.completed_calendar).await
            .map_err(|err| SyncError::mutation("move", calendar, err))?;
        if event.color_id.is_some() {
            store.update_event(&identity.completed_calendar, &event.id, EventPatch::clear_color()).await
                .map_err(|err| SyncError::mutation("update", &identity.completed_calendar, err))?;
        }
        ctx.stats.completed_tasks.push(EventRecord::new(&identity.completed_calendar, &event.summary));
    }
    Ok(())
}


#[cfg(test)]
mod test {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    use crate::config::Config;
    use crate::error::{BoxError, UpstreamError};
    use crate::event::DateSpec;
    use crate::provider::sync_progress::SyncProgress;

    struct StaticFeeds(HashMap<String, Vec<Task>>);

    #[async_trait]
    impl TaskSource for StaticFeeds {
        async fn fetch_tasks(&self, link: &str) -> Result<Vec<Task>, BoxError> {
            self.0.get(link).cloned().ok_or_else(|| Box::new(UpstreamError::InvalidLink) as BoxError)
        }
    }

    fn task(id: &str) -> Task {
        let day = DateSpec::all_day(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        Task::new(id.into(), format!("Task {}", id), None, day.clone(), day)
    }

    fn config() -> Config {
        Config::from_json_str(r#"{
            "ics_calendars": [
                { "link": "https://feeds/all.ics", "calendar": "Tasks", "completed_calendar": "Done", "ignored_tags": ["work"] },
                { "link": "https://feeds/work.ics", "calendar": "Work", "completed_calendar": "Done", "tag": "work" }
            ]
        }"#).unwrap()
    }

    #[tokio::test]
    async fn test_tagged_sources_come_first() {
        let config = config();
        let mut feeds = HashMap::new();
        feeds.insert("https://feeds/all.ics".to_string(), vec![task("a"), task("w")]);
        feeds.insert("https://feeds/work.ics".to_string(), vec![task("w")]);
        let reader = StaticFeeds(feeds);

        let mut ctx = RunContext::new(&config, SyncProgress::new());
        let fetched = fetch_all_sources(&mut ctx, &reader, &config.ics_calendars).await.unwrap();
        assert!(fetched.complete);
        let layout: Vec<(&str, Vec<&str>)> = fetched.sources.iter()
            .map(|(s, tasks)| (s.calendar.as_str(), tasks.iter().map(|t| t.id()).collect()))
            .collect();
        assert_eq!(layout, vec![("Work", vec!["w"]), ("Tasks", vec!["a"])]);
    }

    #[tokio::test]
    async fn test_failed_tag_skips_catch_all() {
        let config = config();
        let mut feeds = HashMap::new();
        feeds.insert("https://feeds/all.ics".to_string(), vec![task("a"), task("w")]);
        let reader = StaticFeeds(feeds);

        let mut ctx = RunContext::new(&config, SyncProgress::new());
        let fetched = fetch_all_sources(&mut ctx, &reader, &config.ics_calendars).await.unwrap();
        assert!(fetched.complete == false);
        assert!(fetched.sources.is_empty());
        assert_eq!(ctx.stats.errors.len(), 1);
        assert_eq!(ctx.stats.errors[0].kind, "upstream_unavailable");
    }
}
