//! How managed events look like

use crate::commit::Commit;
use crate::config::IcsSourceConfig;
use crate::event::{DateSpec, Event};
use crate::identity::{CommitIdentity, TaskIdentity};
use crate::task::Task;

/// The event mirroring `task`, for the feed `source`
pub fn task_event(task: &Task, source: &IcsSourceConfig) -> Event {
    let mut event = Event::new(task.display_name(), task.start().clone(), task.end().clone());

    let reference = format!("task: {}", task.id());
    event.description = Some(match task.description() {
        Some(descr) if descr.trim().is_empty() == false => format!("{}\n\n{}", descr.trim_end(), reference),
        _ => reference,
    });
    event.color_id = source.color.clone();
    event.private_properties = TaskIdentity {
        tick_task_id: task.id().to_string(),
        calendar: source.calendar.clone(),
        completed_calendar: source.completed_calendar.clone(),
    }.to_properties();
    event
}

/// Whether the fields the task reconciler tracks differ between a managed event and the event it should be
pub fn task_event_differs(current: &Event, desired: &Event) -> bool {
    current.summary != desired.summary
        || current.start.same_as(&desired.start) == false
        || current.end.same_as(&desired.end) == false
        || current.color_id != desired.color_id
}

/// The message that is written into the event mirroring a commit
pub fn commit_display_message(commit: &Commit, parse_emojis: bool) -> String {
    match parse_emojis {
        true => crate::emoji::parse_emojis(&commit.commit_message),
        false => commit.commit_message.clone(),
    }
}

/// The event mirroring `commit`
pub fn commit_event(commit: &Commit, parse_emojis: bool) -> Event {
    let message = commit_display_message(commit, parse_emojis);
    let date = DateSpec::timed(commit.commit_date, Some(String::from("UTC")));

    let mut event = Event::new(format!("{} - {}", commit.repository_name, message), date.clone(), date);
    event.description = Some(format!("Repository: {}\nCommit: {}", commit.repository_link, commit.commit_url));
    event.private_properties = CommitIdentity::from_commit(commit, &message).to_properties();
    event
}
