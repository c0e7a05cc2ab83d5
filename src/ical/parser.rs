//! A module to parse ICal feeds

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use ical::property::Property;

use crate::error::{BoxError, UpstreamError};
use crate::event::DateSpec;
use crate::task::Task;
use crate::utils::unescape_ics_text;


/// Parse an iCal feed into a list of [`Task`]s.
///
/// Both `VEVENT` and `VTODO` components are read. Floating times (neither `Z` nor `TZID`) are
/// interpreted in `default_tz`
pub fn parse(content: &str, default_tz: Tz) -> Result<Vec<Task>, BoxError> {
    if content.contains("BEGIN:VCALENDAR") == false {
        return Err(Box::new(UpstreamError::MalformedCalendar));
    }

    let mut tasks = Vec::new();
    let reader = ical::IcalParser::new(content.as_bytes());
    for calendar in reader {
        let calendar = calendar.map_err(|err| {
            log::warn!("Unable to parse iCal data: {}", err);
            UpstreamError::MalformedCalendar
        })?;

        let components = calendar.events.iter().map(|e| (&e.properties, "VEVENT"))
            .chain(calendar.todos.iter().map(|t| (&t.properties, "VTODO")));
        for (properties, kind) in components {
            match parse_component(properties, default_tz) {
                Ok(task) => tasks.push(task),
                Err(err) => log::warn!("Skipping a {}: {}", kind, err),
            }
        }
    }

    Ok(tasks)
}

fn parse_component(properties: &[Property], default_tz: Tz) -> Result<Task, BoxError> {
    let mut uid = None;
    let mut summary = None;
    let mut description = None;
    let mut start = None;
    let mut end = None;
    let mut due = None;

    for prop in properties {
        match prop.name.as_str() {
            "UID" => uid = prop.value.clone(),
            "SUMMARY" => summary = prop.value.clone(),
            "DESCRIPTION" => description = prop.value.as_deref().map(unescape_ics_text),
            "DTSTART" => start = Some(parse_date_property(prop, default_tz)?),
            "DTEND" => end = Some(parse_date_property(prop, default_tz)?),
            "DUE" => due = Some(parse_date_property(prop, default_tz)?),
            _ => {},
        }
    }

    let uid = match uid {
        Some(uid) if uid.trim().is_empty() == false => uid,
        _ => return Err("missing UID".into()),
    };
    let start = match start.or_else(|| due.clone()) {
        Some(start) => start,
        None => return Err(format!("missing start date for {}", uid).into()),
    };
    let end = end.or(due).unwrap_or_else(|| start.clone());

    Ok(Task::new(uid, summary.unwrap_or_default(), description.filter(|d| d.is_empty() == false), start, end))
}

/// Interpret a `DTSTART`/`DTEND`/`DUE` property
pub fn parse_date_property(prop: &Property, default_tz: Tz) -> Result<DateSpec, BoxError> {
    let value = match &prop.value {
        None => return Err(format!("empty {}", prop.name).into()),
        Some(v) => v.trim(),
    };

    let is_date = param(prop, "VALUE").map(|v| v.eq_ignore_ascii_case("DATE")).unwrap_or(false)
        || (value.len() == 8 && value.chars().all(|c| c.is_ascii_digit()));
    if is_date {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d")
            .map_err(|err| format!("invalid date '{}' in {}: {}", value, prop.name, err))?;
        return Ok(DateSpec::all_day(date));
    }

    if let Some(utc) = value.strip_suffix('Z') {
        let naive = parse_naive_date_time(utc, &prop.name)?;
        return Ok(DateSpec::timed(Utc.from_utc_datetime(&naive), Some(String::from("UTC"))));
    }

    let naive = parse_naive_date_time(value, &prop.name)?;
    let tz = match param(prop, "TZID") {
        None => default_tz,
        Some(tzid) => match tzid.trim_matches('"').parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                log::warn!("Unknown TZID '{}', using {} instead", tzid, default_tz);
                default_tz
            },
        },
    };
    let local = tz.from_local_datetime(&naive).earliest()
        .ok_or_else(|| format!("{} does not exist in {}", value, tz))?;
    Ok(DateSpec::timed(local.with_timezone(&Utc), Some(tz.name().to_string())))
}

fn parse_naive_date_time(value: &str, prop_name: &str) -> Result<NaiveDateTime, BoxError> {
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .map_err(|err| format!("invalid date-time '{}' in {}: {}", value, prop_name, err).into())
}

fn param<'a>(prop: &'a Property, name: &str) -> Option<&'a str> {
    prop.params.as_ref()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(|v| v.as_str())
}


#[cfg(test)]
mod test {
    use super::*;

    const EXAMPLE_FEED: &str = "BEGIN:VCALENDAR\r
VERSION:2.0\r
PRODID:-//TickTick//Calendar//EN\r
BEGIN:VEVENT\r
UID:task-1\r
SUMMARY:Call Mom\\, then Dad\r
DESCRIPTION:Don't forget\\nthe gift\r
DTSTART;VALUE=DATE:20240301\r
DTEND;VALUE=DATE:20240302\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:task-2\r
SUMMARY:Dentist\r
DTSTART;TZID=Europe/Paris:20240301T100000\r
DTEND;TZID=Europe/Paris:20240301T110000\r
END:VEVENT\r
BEGIN:VEVENT\r
SUMMARY:No uid\r
DTSTART:20240301T100000Z\r
END:VEVENT\r
BEGIN:VTODO\r
UID:todo-1\r
SUMMARY:Pay rent\r
DUE:20240305T090000Z\r
END:VTODO\r
BEGIN:VEVENT\r
UID:task-3\r
SUMMARY:Floating\r
DTSTART:20240301T120000\r
END:VEVENT\r
END:VCALENDAR\r
";

    #[test]
    fn test_feed_parsing() {
        let tasks = parse(EXAMPLE_FEED, chrono_tz::America::New_York).unwrap();
        let ids: Vec<&str> = tasks.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["task-1", "task-2", "task-3", "todo-1"]);

        let t1 = &tasks[0];
        assert_eq!(t1.display_name(), "Call Mom, then Dad");
        assert_eq!(t1.description(), Some("Don't forget\nthe gift"));
        assert_eq!(t1.start(), &DateSpec::all_day(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        assert!(t1.end().is_all_day());

        let t2 = &tasks[1];
        assert_eq!(t2.start(), &DateSpec::timed(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(), Some("Europe/Paris".into())));

        let floating = &tasks[2];
        assert!(floating.start().same_as(&DateSpec::timed(Utc.with_ymd_and_hms(2024, 3, 1, 17, 0, 0).unwrap(), None)));
        assert_eq!(floating.end(), floating.start());

        let todo = &tasks[3];
        assert_eq!(todo.start(), todo.end());
        assert!(todo.start().same_as(&DateSpec::timed(Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap(), None)));
    }

    #[test]
    fn test_missing_header() {
        let err = parse("<html>Not found</html>", Tz::UTC).unwrap_err();
        assert_eq!(err.downcast_ref::<UpstreamError>(), Some(&UpstreamError::MalformedCalendar));
    }

    #[test]
    fn test_empty_calendar() {
        let tasks = parse("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n", Tz::UTC).unwrap();
        assert!(tasks.is_empty());
    }
}
