//! Calendar events, as exchanged with a [`CalendarStore`](crate::traits::CalendarStore)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};

/// When an event (or a task) starts or ends.
///
/// The variant itself is meaningful: an all-day task must stay an all-day event, and vice versa.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateSpec {
    AllDay { date: NaiveDate },
    Timed {
        #[serde(rename = "dateTime")]
        date_time: DateTime<Utc>,
        #[serde(rename = "timeZone")]
        time_zone: Option<String>,
    },
}

impl DateSpec {
    pub fn all_day(date: NaiveDate) -> Self {
        DateSpec::AllDay { date }
    }

    pub fn timed(date_time: DateTime<Utc>, time_zone: Option<String>) -> Self {
        DateSpec::Timed { date_time, time_zone }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, DateSpec::AllDay { .. })
    }

    /// Whether both values have the same variant and designate the same day or the same instant.
    ///
    /// The time zone label is ignored, since providers may echo a timed value in another zone
    pub fn same_as(&self, other: &DateSpec) -> bool {
        match (self, other) {
            (DateSpec::AllDay { date: l }, DateSpec::AllDay { date: r }) => l == r,
            (DateSpec::Timed { date_time: l, .. }, DateSpec::Timed { date_time: r, .. }) => l == r,
            _ => false,
        }
    }
}

impl std::fmt::Display for DateSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateSpec::AllDay { date } => write!(f, "{}", date.format("%Y-%m-%d")),
            DateSpec::Timed { date_time, time_zone: Some(tz) } => write!(f, "{} ({})", date_time.to_rfc3339(), tz),
            DateSpec::Timed { date_time, time_zone: None } => write!(f, "{}", date_time.to_rfc3339()),
        }
    }
}

/// A calendar event.
///
/// `private_properties` is the provider-opaque key/value bag this crate uses to store the identity
/// of the source item an event mirrors (see [`crate::identity`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// The provider id. Empty until the event is inserted
    #[serde(default)]
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start: DateSpec,
    pub end: DateSpec,
    #[serde(default)]
    pub color_id: Option<String>,
    #[serde(default)]
    pub private_properties: BTreeMap<String, String>,
}

impl Event {
    /// Create an event that is not on any calendar yet
    pub fn new(summary: String, start: DateSpec, end: DateSpec) -> Self {
        Self {
            id: String::new(),
            summary,
            description: None,
            start,
            end,
            color_id: None,
            private_properties: BTreeMap::new(),
        }
    }

    pub fn private_property(&self, key: &str) -> Option<&str> {
        self.private_properties.get(key).map(|s| s.as_str())
    }

    /// Apply a patch in place, the same way a provider would
    pub fn apply(&mut self, patch: &EventPatch) {
        if let Some(summary) = &patch.summary {
            self.summary = summary.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(start) = &patch.start {
            self.start = start.clone();
        }
        if let Some(end) = &patch.end {
            self.end = end.clone();
        }
        if let Some(color_id) = &patch.color_id {
            self.color_id = color_id.clone();
        }
        if let Some(props) = &patch.private_properties {
            self.private_properties = props.clone();
        }
    }
}

/// A partial update of an [`Event`]. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventPatch {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start: Option<DateSpec>,
    pub end: Option<DateSpec>,
    /// `Some(None)` clears the color
    pub color_id: Option<Option<String>>,
    /// Replaces the whole private bag
    pub private_properties: Option<BTreeMap<String, String>>,
}

impl EventPatch {
    /// A patch that rewrites every field of `target`
    pub fn from_event(target: &Event) -> Self {
        Self {
            summary: Some(target.summary.clone()),
            description: target.description.clone(),
            start: Some(target.start.clone()),
            end: Some(target.end.clone()),
            color_id: Some(target.color_id.clone()),
            private_properties: Some(target.private_properties.clone()),
        }
    }

    pub fn clear_color() -> Self {
        Self { color_id: Some(None), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_date_spec_variant_matters() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let midnight = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert!(DateSpec::all_day(day).same_as(&DateSpec::all_day(day)));
        assert!(DateSpec::all_day(day).same_as(&DateSpec::timed(midnight, None)) == false);
        assert!(DateSpec::timed(midnight, None).same_as(&DateSpec::timed(midnight, Some("Europe/Paris".into()))));
    }

    #[test]
    fn test_apply_patch() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut event = Event::new("Buy milk".into(), DateSpec::all_day(day), DateSpec::all_day(day));
        event.color_id = Some("5".into());

        event.apply(&EventPatch { summary: Some("Buy oat milk".into()), ..EventPatch::default() });
        assert_eq!(event.summary, "Buy oat milk");
        assert_eq!(event.color_id.as_deref(), Some("5"));

        event.apply(&EventPatch::clear_color());
        assert_eq!(event.color_id, None);
        assert!(EventPatch::default().is_empty());
    }

    #[test]
    fn test_serde_shape() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let json = serde_json::to_value(DateSpec::all_day(day)).unwrap();
        assert_eq!(json["allDay"]["date"], "2024-03-02");
    }
}
