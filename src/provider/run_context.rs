use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::error::SyncError;
use super::session_stats::{ErrorRecord, SessionStats};
use super::sync_progress::SyncProgress;

/// Everything a single sync invocation needs, built at its start and threaded through every reconciler
pub struct RunContext<'c> {
    pub config: &'c Config,
    /// When this invocation started
    pub now: DateTime<Utc>,
    pub progress: SyncProgress,
    pub stats: SessionStats,
}

impl<'c> RunContext<'c> {
    pub fn new(config: &'c Config, progress: SyncProgress) -> Self {
        Self::new_at(config, progress, Utc::now())
    }

    pub fn new_at(config: &'c Config, progress: SyncProgress, now: DateTime<Utc>) -> Self {
        Self {
            config,
            now,
            progress,
            stats: SessionStats::new(now),
        }
    }

    /// Report an error that does not abort the run
    pub fn record_error(&mut self, err: &SyncError) {
        self.progress.error(&err.to_string());
        self.stats.errors.push(ErrorRecord::from(err));
    }
}
