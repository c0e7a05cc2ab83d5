use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::header::USER_AGENT;
use reqwest::StatusCode;

use crate::error::{BoxError, UpstreamError};
use crate::task::Task;
use crate::traits::TaskSource;

/// Fetches ICS feeds over HTTP(S)
pub struct IcsReader {
    client: reqwest::Client,
    default_tz: Tz,
}

impl IcsReader {
    /// `default_tz` is the zone of the feed times that carry neither `Z` nor `TZID`
    pub fn new(default_tz: Tz) -> Self {
        Self {
            client: reqwest::Client::new(),
            default_tz,
        }
    }
}

#[async_trait]
impl TaskSource for IcsReader {
    async fn fetch_tasks(&self, link: &str) -> Result<Vec<Task>, BoxError> {
        // Some task managers publish webcal:// links, which are plain https
        let link = match link.strip_prefix("webcal://") {
            Some(rest) => format!("https://{}", rest),
            None => link.to_string(),
        };

        log::debug!("Fetching ICS feed {}", link);
        let response = self.client
            .get(&link)
            .header(USER_AGENT, super::USER_AGENT)
            .send()
            .await
            .map_err(|err| UpstreamError::Http(err.to_string()))?;

        if response.status() != StatusCode::OK {
            log::warn!("ICS feed answered with HTTP {}", response.status());
            return Err(Box::new(UpstreamError::InvalidLink));
        }

        let content = response.text().await
            .map_err(|err| UpstreamError::Http(err.to_string()))?;
        let tasks = crate::ical::parse(&content, self.default_tz)?;
        log::debug!("{} tasks in the feed", tasks.len());
        Ok(tasks)
    }
}
