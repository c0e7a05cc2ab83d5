//! Progress of a sync invocation, as logs and as events sent to an optional listener

use std::fmt::{Display, Error, Formatter};

/// What the engine is currently reading or writing
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncSource {
    /// The ICS feeds as a whole, before they are reconciled one by one
    TaskFeeds,
    /// A single ICS feed, identified by the calendar its tasks are mirrored into
    TaskFeed { calendar: String, tag: Option<String> },
    /// The commits of a GitHub user
    Commits { username: String },
}

impl Display for SyncSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            SyncSource::TaskFeeds => write!(f, "tasks"),
            SyncSource::TaskFeed { calendar, tag: Some(tag) } => write!(f, "tasks [{}] -> {}", tag, calendar),
            SyncSource::TaskFeed { calendar, tag: None } => write!(f, "tasks -> {}", calendar),
            SyncSource::Commits { username } => write!(f, "commits of {}", username),
        }
    }
}

/// An event that happens during a sync
#[derive(Clone, Debug, PartialEq)]
pub enum SyncEvent {
    NotStarted,
    /// Sync has just started, calendars are being checked
    Started,
    InProgress{ source: SyncSource, details: String },
    /// Commit changes are waiting for more identical observations before being applied
    Confirming{ observed: u32, required: u32 },
    Finished{ success: bool },
}

impl Display for SyncEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            SyncEvent::NotStarted => write!(f, "Not started"),
            SyncEvent::Started => write!(f, "Sync has started..."),
            SyncEvent::InProgress{source, details} => write!(f, "[{}] {}...", source, details),
            SyncEvent::Confirming{observed, required} => write!(f, "[commits] changes seen {}/{} times", observed, required),
            SyncEvent::Finished{success} => match success {
                true => write!(f, "Sync successfully finished"),
                false => write!(f, "Sync finished with errors"),
            }
        }
    }
}

impl Default for SyncEvent {
    fn default() -> Self {
        Self::NotStarted
    }
}


/// See [`feedback_channel`]
pub type FeedbackSender = tokio::sync::watch::Sender<SyncEvent>;
/// See [`feedback_channel`]
pub type FeedbackReceiver = tokio::sync::watch::Receiver<SyncEvent>;

/// Create a feedback channel, whose receiver always holds the latest [`SyncEvent`] of a running sync
pub fn feedback_channel() -> (FeedbackSender, FeedbackReceiver) {
    tokio::sync::watch::channel(SyncEvent::default())
}


/// Logs of a sync invocation. Errors and warnings are counted, a run that had any is not successful
#[derive(Debug, Default)]
pub struct SyncProgress {
    n_errors: u32,
    /// The source whose events are logged with a prefix
    current_source: Option<SyncSource>,
    feedback_channel: Option<FeedbackSender>,
}

impl SyncProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_feedback_channel(channel: FeedbackSender) -> Self {
        Self { feedback_channel: Some(channel), ..Self::default() }
    }

    pub fn is_success(&self) -> bool {
        self.n_errors == 0
    }

    pub fn n_errors(&self) -> u32 {
        self.n_errors
    }

    /// Report progress on `source`. Later log lines are prefixed with it
    pub fn start_source(&mut self, source: SyncSource, details: String) {
        self.current_source = Some(source.clone());
        self.feedback(SyncEvent::InProgress{ source, details });
    }

    pub fn error(&mut self, text: &str) {
        log::error!("{}{}", self.prefix(), text);
        self.n_errors += 1;
    }
    pub fn warn(&mut self, text: &str) {
        log::warn!("{}{}", self.prefix(), text);
        self.n_errors += 1;
    }
    pub fn info(&mut self, text: &str) {
        log::info!("{}{}", self.prefix(), text);
    }
    pub fn debug(&mut self, text: &str) {
        log::debug!("{}{}", self.prefix(), text);
    }
    pub fn trace(&mut self, text: &str) {
        log::trace!("{}{}", self.prefix(), text);
    }

    /// Send an event to the listener, if any
    pub fn feedback(&mut self, event: SyncEvent) {
        if let SyncEvent::Finished{ .. } = event {
            self.current_source = None;
        }
        if let Some(sender) = self.feedback_channel.as_ref() {
            // Nobody listening is not an error
            let _ = sender.send(event);
        }
    }

    fn prefix(&self) -> String {
        match &self.current_source {
            Some(source) => format!("[{}] ", source),
            None => String::new(),
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_feedback_and_error_count() {
        let (sender, receiver) = feedback_channel();
        let mut progress = SyncProgress::new_with_feedback_channel(sender);
        assert_eq!(*receiver.borrow(), SyncEvent::NotStarted);

        progress.start_source(SyncSource::TaskFeed{ calendar: "Work".into(), tag: Some("work".into()) }, "reading".into());
        assert_eq!(receiver.borrow().to_string(), "[tasks [work] -> Work] reading...");
        assert_eq!(progress.prefix(), "[tasks [work] -> Work] ");

        progress.feedback(SyncEvent::Confirming{ observed: 2, required: 3 });
        assert_eq!(receiver.borrow().to_string(), "[commits] changes seen 2/3 times");

        progress.info("fine");
        assert!(progress.is_success());
        progress.warn("hmm");
        progress.error("oops");
        assert_eq!(progress.n_errors(), 2);
        assert!(progress.is_success() == false);

        progress.feedback(SyncEvent::Finished{ success: false });
        assert_eq!(progress.prefix(), "");
    }

    #[test]
    fn test_no_listener() {
        let mut progress = SyncProgress::new();
        progress.start_source(SyncSource::Commits{ username: "john".into() }, "reading".into());
        assert_eq!(progress.prefix(), "[commits of john] ");
    }
}
