use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

use crate::error::BoxError;
use crate::event::{DateSpec, Event, EventPatch};
use crate::traits::CalendarStore;

static API_ROOT: &str = "https://www.googleapis.com/calendar/v3/";

/// Google caps `maxResults` of an event listing to this value
const EVENTS_PAGE_SIZE: u32 = 2500;


/// A calendar store backed by the Google Calendar v3 API.
///
/// Calendars are addressed by name: the first call lists the calendars the user owns and remembers their ids.
pub struct GoogleCalendarStore {
    api_root: Url,
    access_token: String,
    client: reqwest::Client,

    /// Calendar name -> calendar id
    calendar_ids: Option<BTreeMap<String, String>>,
}

impl GoogleCalendarStore {
    /// Create a store. This does not start a connection
    pub fn new<T: ToString>(access_token: T) -> Result<Self, BoxError> {
        Self::with_api_root(API_ROOT, access_token)
    }

    /// Create a store talking to another API root (e.g. a local test server)
    pub fn with_api_root<S: AsRef<str>, T: ToString>(api_root: S, access_token: T) -> Result<Self, BoxError> {
        let api_root = Url::parse(api_root.as_ref())?;
        Ok(Self {
            api_root,
            access_token: access_token.to_string(),
            client: reqwest::Client::new(),
            calendar_ids: None,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, BoxError> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|_| format!("{} cannot be a base URL", self.api_root))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url, body: Option<Value>) -> Result<Value, BoxError> {
        log::trace!("{} {}", method, url);
        let mut request = self.client
            .request(method.clone(), url.clone())
            .bearer_auth(&self.access_token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() == false {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("Google Calendar API error on {} {}: HTTP {} ({})", method, url.path(), status, api_error_message(&text)).into());
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Return the calendar ids, or fetch them from the server if not known yet
    async fn get_calendar_ids(&mut self) -> Result<&BTreeMap<String, String>, BoxError> {
        if self.calendar_ids.is_none() {
            let mut ids = BTreeMap::new();
            let mut page_token: Option<String> = None;
            loop {
                let mut url = self.url(&["users", "me", "calendarList"])?;
                url.query_pairs_mut().append_pair("minAccessRole", "owner");
                if let Some(token) = &page_token {
                    url.query_pairs_mut().append_pair("pageToken", token);
                }
                let page: ListPage<GoogleCalendarEntry> = serde_json::from_value(self.request(Method::GET, url, None).await?)?;
                for entry in page.items {
                    log::debug!("Found calendar {} ({})", entry.summary, entry.id);
                    ids.entry(entry.summary).or_insert(entry.id);
                }
                match page.next_page_token {
                    None => break,
                    Some(token) => page_token = Some(token),
                }
            }
            self.calendar_ids = Some(ids);
        }
        self.calendar_ids.as_ref().ok_or_else(|| "calendar list unavailable".into())
    }

    async fn calendar_id(&mut self, name: &str) -> Result<String, BoxError> {
        match self.get_calendar_ids().await?.get(name) {
            Some(id) => Ok(id.clone()),
            None => Err(format!("No calendar named {}", name).into()),
        }
    }
}

#[async_trait]
impl CalendarStore for GoogleCalendarStore {
    async fn list_calendars(&mut self) -> Result<Vec<String>, BoxError> {
        Ok(self.get_calendar_ids().await?.keys().cloned().collect())
    }

    async fn create_calendar(&mut self, name: &str) -> Result<(), BoxError> {
        if self.get_calendar_ids().await?.contains_key(name) {
            return Err(format!("A calendar named {} already exists", name).into());
        }
        let url = self.url(&["calendars"])?;
        let created: GoogleCalendarEntry = serde_json::from_value(
            self.request(Method::POST, url, Some(json!({ "summary": name }))).await?
        )?;
        log::info!("Created calendar {} ({})", name, created.id);
        if let Some(ids) = self.calendar_ids.as_mut() {
            ids.insert(name.to_string(), created.id);
        }
        Ok(())
    }

    async fn list_events(&mut self, calendar: &str) -> Result<Vec<Event>, BoxError> {
        let calendar_id = self.calendar_id(calendar).await?;
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.url(&["calendars", &calendar_id, "events"])?;
            url.query_pairs_mut()
                .append_pair("maxResults", &EVENTS_PAGE_SIZE.to_string())
                .append_pair("showDeleted", "false");
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }
            let page: ListPage<GoogleEvent> = serde_json::from_value(self.request(Method::GET, url, None).await?)?;
            for google_event in page.items {
                if google_event.status.as_deref() == Some("cancelled") {
                    continue;
                }
                match google_event.into_event() {
                    Err(err) => log::warn!("Ignoring an event of calendar {}: {}", calendar, err),
                    Ok(event) => events.push(event),
                }
            }
            match page.next_page_token {
                None => break,
                Some(token) => page_token = Some(token),
            }
        }
        log::debug!("{} events in calendar {}", events.len(), calendar);
        Ok(events)
    }

    async fn insert_event(&mut self, calendar: &str, event: Event) -> Result<Event, BoxError> {
        let calendar_id = self.calendar_id(calendar).await?;
        let url = self.url(&["calendars", &calendar_id, "events"])?;
        let body = serde_json::to_value(GoogleEvent::from_event(&event))?;
        let created: GoogleEvent = serde_json::from_value(self.request(Method::POST, url, Some(body)).await?)?;
        created.into_event()
    }

    async fn update_event(&mut self, calendar: &str, event_id: &str, patch: EventPatch) -> Result<Event, BoxError> {
        let calendar_id = self.calendar_id(calendar).await?;
        let url = self.url(&["calendars", &calendar_id, "events", event_id])?;
        let updated: GoogleEvent = serde_json::from_value(
            self.request(Method::PATCH, url, Some(patch_body(&patch))).await?
        )?;
        updated.into_event()
    }

    async fn move_event(&mut self, from_calendar: &str, event_id: &str, to_calendar: &str) -> Result<Event, BoxError> {
        let from_id = self.calendar_id(from_calendar).await?;
        let to_id = self.calendar_id(to_calendar).await?;
        let mut url = self.url(&["calendars", &from_id, "events", event_id, "move"])?;
        url.query_pairs_mut().append_pair("destination", &to_id);
        let moved: GoogleEvent = serde_json::from_value(self.request(Method::POST, url, None).await?)?;
        moved.into_event()
    }

    async fn delete_event(&mut self, calendar: &str, event_id: &str) -> Result<(), BoxError> {
        let calendar_id = self.calendar_id(calendar).await?;
        let url = self.url(&["calendars", &calendar_id, "events", event_id])?;
        self.request(Method::DELETE, url, None).await?;
        Ok(())
    }
}


#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct GoogleCalendarEntry {
    id: String,
    #[serde(default)]
    summary: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventDate {
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

impl GoogleEventDate {
    fn from_spec(spec: &DateSpec) -> Self {
        match spec {
            DateSpec::AllDay { date } => Self { date: Some(*date), ..Self::default() },
            DateSpec::Timed { date_time, time_zone } => Self {
                date: None,
                date_time: Some(*date_time),
                time_zone: time_zone.clone(),
            },
        }
    }

    fn to_spec(&self) -> Result<DateSpec, BoxError> {
        match (&self.date, &self.date_time) {
            (_, Some(dt)) => Ok(DateSpec::timed(*dt, self.time_zone.clone())),
            (Some(date), None) => Ok(DateSpec::all_day(*date)),
            (None, None) => Err("event date has neither a date nor a dateTime".into()),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleExtendedProperties {
    #[serde(default)]
    private: BTreeMap<String, String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    id: String,
    #[serde(default)]
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    start: Option<GoogleEventDate>,
    end: Option<GoogleEventDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extended_properties: Option<GoogleExtendedProperties>,
    #[serde(skip_serializing)]
    status: Option<String>,
}

impl GoogleEvent {
    fn from_event(event: &Event) -> Self {
        let extended_properties = match event.private_properties.is_empty() {
            true => None,
            false => Some(GoogleExtendedProperties { private: event.private_properties.clone() }),
        };
        Self {
            id: String::new(),
            summary: event.summary.clone(),
            description: event.description.clone(),
            start: Some(GoogleEventDate::from_spec(&event.start)),
            end: Some(GoogleEventDate::from_spec(&event.end)),
            color_id: event.color_id.clone(),
            extended_properties,
            status: None,
        }
    }

    fn into_event(self) -> Result<Event, BoxError> {
        let start = match &self.start {
            None => return Err(format!("event {} has no start", self.id).into()),
            Some(s) => s.to_spec()?,
        };
        let end = match &self.end {
            None => start.clone(),
            Some(e) => e.to_spec()?,
        };
        Ok(Event {
            id: self.id,
            summary: self.summary,
            description: self.description,
            start,
            end,
            color_id: self.color_id,
            private_properties: self.extended_properties.map(|p| p.private).unwrap_or_default(),
        })
    }
}

/// The JSON body of a PATCH request. Fields that are not patched are absent, a cleared color is `null`
fn patch_body(patch: &EventPatch) -> Value {
    let mut body = Map::new();
    if let Some(summary) = &patch.summary {
        body.insert("summary".into(), json!(summary));
    }
    if let Some(description) = &patch.description {
        body.insert("description".into(), json!(description));
    }
    if let Some(start) = &patch.start {
        body.insert("start".into(), patch_date(start));
    }
    if let Some(end) = &patch.end {
        body.insert("end".into(), patch_date(end));
    }
    if let Some(color_id) = &patch.color_id {
        body.insert("colorId".into(), json!(color_id));
    }
    if let Some(props) = &patch.private_properties {
        body.insert("extendedProperties".into(), json!({ "private": props }));
    }
    Value::Object(body)
}

/// Google merges nested objects on PATCH, so the key of the other date variant has to be nulled explicitly
fn patch_date(spec: &DateSpec) -> Value {
    match spec {
        DateSpec::AllDay { date } => json!({ "date": date, "dateTime": null, "timeZone": null }),
        DateSpec::Timed { date_time, time_zone } => json!({ "date": null, "dateTime": date_time, "timeZone": time_zone }),
    }
}

/// Google wraps its errors as `{"error": {"message": ...}}`
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body).ok()
        .and_then(|v| v["error"]["message"].as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
