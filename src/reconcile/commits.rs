use itertools::Itertools;

use crate::commit::Commit;
use crate::config::GithubConfig;
use crate::content::commit_event;
use crate::error::{SyncError, SyncResult};
use crate::event::Event;
use crate::identity::CommitIdentity;
use crate::provider::run_context::RunContext;
use crate::provider::session_stats::EventRecord;
use crate::provider::sync_progress::{SyncEvent, SyncSource};
use crate::traits::{CalendarStore, CommitSource, PropertyStore};
use crate::utils::comparison::compare_commits_newest_first;
use super::confirmation::{next_transition, ConfirmationState, ResetReason, Transition};

/// The commits to mirror, and the mirrors that no longer have a commit
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Candidates {
    pub to_add: Vec<Commit>,
    pub to_delete: Vec<Event>,
}

/// Compare the commits of the user with the managed events of the commits calendar.
///
/// Only commits of repositories owned by the user and not ignored are considered. Commits and events are
/// matched on `(repository, commitDate, commitMessage)`, messages being compared after emoji normalization
pub fn compute_candidates(github: &GithubConfig, commits: &[Commit], events: &[Event]) -> Candidates {
    let valid: Vec<&Commit> = commits.iter()
        .filter(|c| c.is_owned_by(&github.username))
        .filter(|c| github.is_ignored_repo(&c.repository) == false)
        .collect();

    let managed: Vec<(&Event, CommitIdentity)> = events.iter()
        .filter_map(|e| CommitIdentity::from_event(e).map(|identity| (e, identity)))
        .collect();

    let to_add = valid.iter()
        .filter(|commit| managed.iter().any(|(_, identity)| identity.matches(commit)) == false)
        .unique_by(|commit| (commit.repository.clone(), commit.commit_id.clone()))
        .map(|commit| (*commit).clone())
        .collect();

    let to_delete = managed.iter()
        .filter(|(_, identity)| valid.iter().any(|commit| identity.matches(commit)) == false)
        .map(|(event, _)| (*event).clone())
        .collect();

    Candidates { to_add, to_delete }
}

/// Mirror the commits of the user into the commits calendar, behind the confirmation gate
pub async fn sync_commits<C, P, S>(ctx: &mut RunContext<'_>, store: &mut C, properties: &mut P, reader: &S, github: &GithubConfig) -> SyncResult<()>
where
    C: CalendarStore + ?Sized,
    P: PropertyStore + ?Sized,
    S: CommitSource + ?Sized,
{
    ctx.progress.start_source(SyncSource::Commits{ username: github.username.clone() }, "reading the commits".to_string());
    let commits = reader.fetch_commits(&github.username, github.token.as_deref()).await
        .map_err(|err| SyncError::upstream("GitHub commits", err))?;
    ctx.progress.debug(&format!("{} commits found", commits.len()));
    for commit in commits.iter().sorted_by(compare_commits_newest_first).take(5) {
        ctx.progress.trace(&format!("  {} {} {}", commit.commit_date.to_rfc3339(), commit.repository, commit.commit_message));
    }

    let calendar = github.commits_calendar.as_str();
    let events = store.list_events(calendar).await
        .map_err(|err| SyncError::CalendarStore(format!("unable to list the events of {}: {}", calendar, err)))?;

    let candidates = compute_candidates(github, &commits, &events);
    ctx.progress.debug(&format!("{} commits to add, {} events to delete", candidates.to_add.len(), candidates.to_delete.len()));

    let state = ConfirmationState::load(properties)?;
    let transition = next_transition(&state, &candidates.to_add, &candidates.to_delete, ctx.config.settings.confirmation_passes);
    ctx.progress.debug(&format!("Confirmation gate: {:?} -> {:?}", state.phase(), transition.target_phase()));

    match transition {
        Transition::Reset(reason) => {
            if reason == ResetReason::Mismatch {
                ctx.progress.info("Commit changes differ from the previous runs, starting a new confirmation cycle");
            }
            ConfirmationState::reset(properties)?;
            ctx.stats.commit_confirmation_count = Some(0);
        },
        Transition::Start(new_state) => {
            ctx.progress.info(&format!("Tracking {} commits to add and {} to delete", new_state.to_add.len(), new_state.to_delete.len()));
            new_state.save(properties)?;
            ctx.stats.commit_confirmation_count = Some(new_state.count);
            ctx.progress.feedback(SyncEvent::Confirming{ observed: new_state.count, required: ctx.config.settings.confirmation_passes });
        },
        Transition::Advance(count) => {
            let advanced = ConfirmationState { count, ..state };
            advanced.save(properties)?;
            ctx.stats.commit_confirmation_count = Some(count);
            ctx.progress.feedback(SyncEvent::Confirming{ observed: count, required: ctx.config.settings.confirmation_passes });
        },
        Transition::Commit { to_add, to_delete } => {
            let result = apply_changes(ctx, store, github, &to_add, &to_delete).await;
            // Whatever happened, the next run starts a new cycle
            let reset = ConfirmationState::reset(properties);
            ctx.stats.commit_confirmation_count = Some(0);
            if let (Err(_), Err(reset_err)) = (&result, &reset) {
                ctx.progress.error(&format!("Unable to reset the confirmation state: {}", reset_err));
            }
            result?;
            reset?;
        },
    }
    Ok(())
}

async fn apply_changes<C>(ctx: &mut RunContext<'_>, store: &mut C, github: &GithubConfig, to_add: &[Commit], to_delete: &[Event]) -> SyncResult<()>
where
    C: CalendarStore + ?Sized,
{
    let calendar = github.commits_calendar.as_str();

    for commit in to_add.iter().sorted_by(compare_commits_newest_first) {
        let event = commit_event(commit, github.parse_commit_emojis);
        ctx.progress.debug(&format!("Adding commit {} ({})", commit.commit_id, event.summary));
        let inserted = store.insert_event(calendar, event).await
            .map_err(|err| SyncError::mutation("insert", calendar, err))?;
        ctx.stats.added_commits.push(EventRecord::new(calendar, &inserted.summary));
    }

    for event in to_delete {
        ctx.progress.debug(&format!("Deleting commit event {} ({})", event.id, event.summary));
        store.delete_event(calendar, &event.id).await
            .map_err(|err| SyncError::mutation("delete", calendar, err))?;
        ctx.stats.deleted_commits.push(EventRecord::new(calendar, &event.summary));
    }
    Ok(())
}
