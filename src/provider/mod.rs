//! This modules ties the sources of truth, the calendar store and the property store together
//!
//! It is responsible for running one sync invocation: every enabled reconciler, in order, and the bookkeeping around them

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use crate::config::Config;
use crate::error::{SyncError, SyncResult};
use crate::reconcile::{commits, tasks};
use crate::traits::{CalendarStore, CommitSource, PropertyStore, TaskSource};

pub mod run_context;
pub mod session_stats;
pub mod sync_progress;
use run_context::RunContext;
use session_stats::SessionStats;
use sync_progress::SyncProgress;
use sync_progress::{FeedbackSender, SyncEvent};

/// The stats of the last run are stored under this property
pub const LAST_SESSION_STATS_KEY: &str = "last_session_stats";
/// The start date of a run in progress is stored under this property, when the run guard is enabled
pub const RUN_STARTED_AT_KEY: &str = "sync_run_started_at";


/// Mirrors task feeds and commits into a calendar store.
///
/// Usually, this will be a `Provider<GoogleCalendarStore, FilePropertyStore, IcsReader, GithubReader>`. \
/// Integration tests rather use in-memory stores, and static sources.
pub struct Provider<C, P, T, G>
where
    C: CalendarStore,
    P: PropertyStore,
    T: TaskSource,
    G: CommitSource,
{
    calendar: C,
    properties: P,
    task_source: T,
    commit_source: G,
}

impl<C, P, T, G> Provider<C, P, T, G>
where
    C: CalendarStore,
    P: PropertyStore,
    T: TaskSource,
    G: CommitSource,
{
    pub fn new(calendar: C, properties: P, task_source: T, commit_source: G) -> Self {
        Self { calendar, properties, task_source, commit_source }
    }

    /// Returns the calendar store
    pub fn calendar(&self) -> &C { &self.calendar }
    /// Returns the calendar store
    pub fn calendar_mut(&mut self) -> &mut C { &mut self.calendar }
    /// Returns the property store
    pub fn properties(&self) -> &P { &self.properties }
    /// Returns the property store
    pub fn properties_mut(&mut self) -> &mut P { &mut self.properties }

    /// Runs a sync invocation, and provide feeedback to the user about the progress.
    ///
    /// See [`Self::sync`]
    pub async fn sync_with_feedback(&mut self, config: &Config, feedback_sender: FeedbackSender) -> SyncResult<SessionStats> {
        let progress = SyncProgress::new_with_feedback_channel(feedback_sender);
        self.run_sync(config, progress).await
    }

    /// Runs a sync invocation, without giving any feedback.
    ///
    /// The configuration is validated first, and nothing is changed if it is invalid.
    /// Then every calendar the configuration names is created if needed, and the task and commit reconcilers run.
    ///
    /// A source that cannot be read does not abort the invocation: the error is reported in the returned stats.
    /// Any other error aborts it. In this case, the calendars may have been partially changed, but running this
    /// function again will pick up where it failed.
    pub async fn sync(&mut self, config: &Config) -> SyncResult<SessionStats> {
        self.run_sync(config, SyncProgress::new()).await
    }

    async fn run_sync(&mut self, config: &Config, progress: SyncProgress) -> SyncResult<SessionStats> {
        config.validate()?;

        let mut ctx = RunContext::new(config, progress);
        ctx.progress.info("Starting a sync.");
        ctx.progress.feedback(SyncEvent::Started);

        let guarded = self.acquire_run_guard(&ctx)?;

        let result = self.run_sync_inner(&mut ctx).await;
        if let Err(err) = &result {
            ctx.progress.error(&format!("Sync terminated because of an error: {}", err));
            ctx.stats.errors.push(err.into());
        }

        if let Err(err) = self.save_stats(&ctx.stats) {
            ctx.progress.warn(&format!("Unable to save the session stats: {}", err));
        }
        if guarded {
            if let Err(err) = self.properties.delete(RUN_STARTED_AT_KEY) {
                ctx.progress.warn(&format!("Unable to release the run guard: {}", err));
            }
        }

        ctx.progress.info(&format!("Sync done: {}", ctx.stats));
        ctx.progress.feedback(SyncEvent::Finished{ success: result.is_ok() && ctx.progress.is_success() });
        result.map(|_| ctx.stats)
    }

    async fn run_sync_inner(&mut self, ctx: &mut RunContext<'_>) -> SyncResult<()> {
        let config = ctx.config;

        let created = crate::calendar::ensure_calendars(&mut self.calendar, config.managed_calendars()).await?;
        if created.is_empty() == false {
            ctx.progress.info(&format!("Created calendars: {}", created.join(", ")));
        }

        if config.tasks_enabled() {
            tasks::sync_tasks(ctx, &mut self.calendar, &self.task_source).await?;
        } else {
            ctx.progress.debug("Task sync is disabled");
        }

        match config.commits_config() {
            None => ctx.progress.debug("Commit sync is disabled"),
            Some(github) => {
                match commits::sync_commits(ctx, &mut self.calendar, &mut self.properties, &self.commit_source, github).await {
                    Err(err) if err.is_source_local() => ctx.record_error(&err),
                    other => other?,
                }
            },
        }

        Ok(())
    }

    /// Returns whether the guard has been taken (i.e. whether it is enabled)
    fn acquire_run_guard(&mut self, ctx: &RunContext<'_>) -> SyncResult<bool> {
        let minutes = match ctx.config.settings.run_guard_minutes {
            None => return Ok(false),
            Some(minutes) => minutes,
        };

        let started_at = self.properties.get(RUN_STARTED_AT_KEY).map_err(SyncError::property)?
            .and_then(|value| value.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok()))
            .map(|date| date.with_timezone(&Utc));
        if let Some(started_at) = started_at {
            let expiry = started_at + Duration::minutes(minutes as i64);
            if ctx.now < expiry {
                return Err(SyncError::RunInProgress(started_at));
            }
            log::warn!("Ignoring a stale run guard set at {}", started_at);
        }

        self.properties.set(RUN_STARTED_AT_KEY, json!(ctx.now.to_rfc3339())).map_err(SyncError::property)?;
        Ok(true)
    }

    fn save_stats(&mut self, stats: &SessionStats) -> SyncResult<()> {
        let value = serde_json::to_value(stats).map_err(|err| SyncError::Property(err.to_string()))?;
        self.properties.set(LAST_SESSION_STATS_KEY, value).map_err(SyncError::property)
    }
}
