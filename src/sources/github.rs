use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::commit::Commit;
use crate::error::{BoxError, SyncError, UpstreamError};
use crate::traits::CommitSource;

static SEARCH_URL: &str = "https://api.github.com/search/commits";
const PAGE_SIZE: u32 = 100;
/// The commit search never returns more than 1000 results
const MAX_PAGES: u32 = 10;

/// Lists the commits of a user with the GitHub commit search
pub struct GithubReader {
    client: reqwest::Client,
    search_url: String,
}

impl GithubReader {
    pub fn new() -> Self {
        Self::with_search_url(SEARCH_URL)
    }

    /// Query another endpoint (e.g. a GitHub Enterprise server)
    pub fn with_search_url<S: ToString>(search_url: S) -> Self {
        Self {
            client: reqwest::Client::new(),
            search_url: search_url.to_string(),
        }
    }

    async fn fetch_page(&self, username: &str, token: Option<&str>, page: u32) -> Result<Vec<SearchItem>, BoxError> {
        let mut request = self.client
            .get(&self.search_url)
            .query(&[
                ("q", format!("author:{}", username)),
                ("sort", String::from("committer-date")),
                ("per_page", PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ])
            .header(USER_AGENT, super::USER_AGENT)
            .header(ACCEPT, "application/vnd.github.cloak-preview+json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await
            .map_err(|err| UpstreamError::Http(err.to_string()))?;
        let status = response.status();
        if status.is_success() == false {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let results: SearchResults = response.json().await
            .map_err(|err| UpstreamError::Http(format!("unable to decode the commit search: {}", err)))?;
        Ok(results.items)
    }
}

impl Default for GithubReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommitSource for GithubReader {
    async fn fetch_commits(&self, username: &str, token: Option<&str>) -> Result<Vec<Commit>, BoxError> {
        let mut commits = Vec::new();
        for page in 1..=MAX_PAGES {
            let items = self.fetch_page(username, token, page).await?;
            log::debug!("Commit search page {}: {} items", page, items.len());
            if items.is_empty() {
                break;
            }
            commits.extend(items.into_iter().filter_map(SearchItem::into_commit));
        }
        Ok(commits)
    }
}

fn status_error(status: StatusCode, body: &str) -> BoxError {
    match status {
        StatusCode::UNPROCESSABLE_ENTITY => Box::new(UpstreamError::InvalidUsername),
        StatusCode::UNAUTHORIZED => Box::new(UpstreamError::InvalidToken),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS if body.to_lowercase().contains("rate limit") => {
            Box::new(SyncError::RateLimited(format!("GitHub commit search (HTTP {})", status)))
        },
        _ => Box::new(UpstreamError::Http(format!("GitHub commit search answered HTTP {}", status))),
    }
}


#[derive(Deserialize)]
struct SearchResults {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    html_url: String,
    commit: SearchCommit,
    repository: SearchRepository,
}

#[derive(Deserialize)]
struct SearchCommit {
    author: SearchSignature,
    message: String,
}

#[derive(Deserialize)]
struct SearchSignature {
    date: DateTime<Utc>,
}

#[derive(Deserialize)]
struct SearchRepository {
    full_name: String,
    name: String,
    owner: SearchOwner,
    html_url: String,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    fork: bool,
}

#[derive(Deserialize)]
struct SearchOwner {
    login: String,
}

impl SearchItem {
    fn into_commit(self) -> Option<Commit> {
        let commit_id = match Commit::id_from_url(&self.html_url) {
            Some(id) => id.to_string(),
            None => {
                log::warn!("Ignoring a commit with an unexpected URL: {}", self.html_url);
                return None;
            },
        };
        let message = self.commit.message.lines().next().unwrap_or_default().trim().to_string();

        Some(Commit {
            commit_id,
            commit_date: self.commit.author.date,
            commit_message: message,
            commit_url: self.html_url,
            repository: self.repository.full_name,
            repository_name: self.repository.name,
            repository_owner: self.repository.owner.login,
            repository_link: self.repository.html_url,
            is_repository_private: self.repository.private,
            is_repository_fork: self.repository.fork,
        })
    }
}
