//! Errors returned by a sync invocation

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Boxed error type used at the collaborator seams (calendar store, property store, readers)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The substring Google puts in its error message when an insert is refused for a missing field.
/// Google answers this way when it is flooded with inserts, so it is surfaced as a rate limit.
pub(crate) const ABUSIVE_INSERT_PATTERN: &str = "Required";

/// Authentication failures also mention "Required" and must not be mistaken for a refused insert
const AUTH_FAILURE_PATTERNS: &[&str] = &["Login Required", "HTTP 401"];

fn is_abusive_insert(message: &str) -> bool {
    message.contains(ABUSIVE_INSERT_PATTERN)
        && AUTH_FAILURE_PATTERNS.iter().all(|pattern| message.contains(pattern) == false)
}

/// Why an upstream source could not be read
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum UpstreamError {
    /// The ICS link answered with a non-200 status
    #[error("invalid link")]
    InvalidLink,
    /// The ICS payload lacks its `BEGIN:VCALENDAR` header
    #[error("malformed calendar")]
    MalformedCalendar,
    /// GitHub does not know this user
    #[error("invalid username")]
    InvalidUsername,
    /// GitHub refused the token
    #[error("invalid token")]
    InvalidToken,
    /// Any other transport or decoding error
    #[error("{0}")]
    Http(String),
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Unable to read {source_name}: {kind}")]
    UpstreamUnavailable { source_name: String, kind: UpstreamError },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Unable to {action} an event in calendar '{calendar}': {message}")]
    ProviderMutationFailed { action: &'static str, calendar: String, message: String },

    #[error("Calendar store error: {0}")]
    CalendarStore(String),

    #[error("Property store error: {0}")]
    Property(String),

    #[error("Another run started at {0} and has not finished yet")]
    RunInProgress(DateTime<Utc>),
}

impl SyncError {
    /// A short, stable name of this error kind, suitable for reports
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::ConfigInvalid(_) => "config_invalid",
            SyncError::UpstreamUnavailable { .. } => "upstream_unavailable",
            SyncError::RateLimited(_) => "rate_limited",
            SyncError::ProviderMutationFailed { .. } => "provider_mutation_failed",
            SyncError::CalendarStore(_) => "calendar_store",
            SyncError::Property(_) => "property_store",
            SyncError::RunInProgress(_) => "run_in_progress",
        }
    }

    /// Whether this error only concerns a single source, so that other sources may still be synced
    pub fn is_source_local(&self) -> bool {
        matches!(self, SyncError::UpstreamUnavailable { .. })
    }

    pub(crate) fn upstream(source_name: &str, err: BoxError) -> Self {
        match err.downcast::<UpstreamError>() {
            Ok(kind) => SyncError::UpstreamUnavailable { source_name: source_name.to_string(), kind: *kind },
            Err(err) => match err.downcast::<SyncError>() {
                Ok(sync_err) => *sync_err,
                Err(other) => SyncError::UpstreamUnavailable {
                    source_name: source_name.to_string(),
                    kind: UpstreamError::Http(other.to_string()),
                },
            },
        }
    }

    /// Map a failed insert/update/move/delete. Google's "required field" refusal on insert becomes [`SyncError::RateLimited`]
    pub(crate) fn mutation(action: &'static str, calendar: &str, err: BoxError) -> Self {
        let message = err.to_string();
        if action == "insert" && is_abusive_insert(&message) {
            return SyncError::RateLimited(format!("abusive Google Calendar API use ({})", message));
        }
        SyncError::ProviderMutationFailed { action, calendar: calendar.to_string(), message }
    }

    pub(crate) fn property(err: BoxError) -> Self {
        SyncError::Property(err.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_required_field_on_insert_is_rate_limited() {
        let err: BoxError = "API call to calendar.events.insert failed with error: Required".into();
        let mapped = SyncError::mutation("insert", "Tasks", err);
        assert_eq!(mapped.kind(), "rate_limited");

        let err: BoxError = "Required".into();
        let mapped = SyncError::mutation("update", "Tasks", err);
        assert_eq!(mapped.kind(), "provider_mutation_failed");
    }

    #[test]
    fn test_expired_token_on_insert_is_not_rate_limited() {
        let err: BoxError = "Google Calendar API error on POST /calendar/v3/calendars/abc/events: HTTP 401 Unauthorized (Login Required.)".into();
        let mapped = SyncError::mutation("insert", "Tasks", err);
        assert_eq!(mapped.kind(), "provider_mutation_failed");

        let err: BoxError = "Login Required".into();
        assert_eq!(SyncError::mutation("insert", "Tasks", err).kind(), "provider_mutation_failed");
    }

    #[test]
    fn test_upstream_error_messages() {
        assert_eq!(UpstreamError::InvalidLink.to_string(), "invalid link");
        assert_eq!(UpstreamError::Http("connection reset".into()).to_string(), "connection reset");
        let err = SyncError::UpstreamUnavailable { source_name: "github".into(), kind: UpstreamError::InvalidToken };
        assert_eq!(err.to_string(), "Unable to read github: invalid token");
    }

    #[test]
    fn test_upstream_downcast() {
        let err: BoxError = Box::new(UpstreamError::InvalidToken);
        match SyncError::upstream("github", err) {
            SyncError::UpstreamUnavailable { kind, .. } => assert_eq!(kind, UpstreamError::InvalidToken),
            other => panic!("unexpected {:?}", other),
        }

        let err: BoxError = Box::new(SyncError::RateLimited("slow down".to_string()));
        assert_eq!(SyncError::upstream("github", err).kind(), "rate_limited");
    }
}
