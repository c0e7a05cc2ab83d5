//! Shared fixtures of the integration tests: static sources of truth, and a provider made of in-memory stores
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use gcal_sync::calendar::memory_calendar::MemoryCalendarStore;
use gcal_sync::error::{BoxError, UpstreamError};
use gcal_sync::properties::MemoryPropertyStore;
use gcal_sync::traits::{CommitSource, TaskSource};
use gcal_sync::{Commit, Config, DateSpec, Provider, Task};

pub type TestProvider = Provider<MemoryCalendarStore, MemoryPropertyStore, StaticTaskSource, StaticCommitSource>;

pub const ALL_FEED: &str = "https://ticktick.example/all.ics";
pub const WORK_FEED: &str = "https://ticktick.example/work.ics";


/// Task feeds whose content can be changed between two syncs
#[derive(Clone, Default)]
pub struct StaticTaskSource {
    feeds: Arc<Mutex<HashMap<String, Vec<Task>>>>,
}

impl StaticTaskSource {
    pub fn set_feed(&self, link: &str, tasks: Vec<Task>) {
        self.feeds.lock().unwrap().insert(link.to_string(), tasks);
    }

    /// Make a feed answer with `InvalidLink`
    pub fn remove_feed(&self, link: &str) {
        self.feeds.lock().unwrap().remove(link);
    }
}

#[async_trait]
impl TaskSource for StaticTaskSource {
    async fn fetch_tasks(&self, link: &str) -> Result<Vec<Task>, BoxError> {
        match self.feeds.lock().unwrap().get(link) {
            Some(tasks) => Ok(tasks.clone()),
            None => Err(Box::new(UpstreamError::InvalidLink)),
        }
    }
}


/// Commit search results that can be changed between two syncs
#[derive(Clone)]
pub struct StaticCommitSource {
    commits: Arc<Mutex<Result<Vec<Commit>, UpstreamError>>>,
}

impl StaticCommitSource {
    pub fn set_commits(&self, commits: Vec<Commit>) {
        *self.commits.lock().unwrap() = Ok(commits);
    }

    pub fn set_error(&self, err: UpstreamError) {
        *self.commits.lock().unwrap() = Err(err);
    }
}

impl Default for StaticCommitSource {
    fn default() -> Self {
        Self { commits: Arc::new(Mutex::new(Ok(Vec::new()))) }
    }
}

#[async_trait]
impl CommitSource for StaticCommitSource {
    async fn fetch_commits(&self, _username: &str, _token: Option<&str>) -> Result<Vec<Commit>, BoxError> {
        match &*self.commits.lock().unwrap() {
            Ok(commits) => Ok(commits.clone()),
            Err(err) => Err(Box::new(err.clone())),
        }
    }
}


pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A provider with empty stores, and handles to change what the sources return
pub fn test_provider() -> (TestProvider, StaticTaskSource, StaticCommitSource) {
    let tasks = StaticTaskSource::default();
    let commits = StaticCommitSource::default();
    let provider = Provider::new(
        MemoryCalendarStore::new(),
        MemoryPropertyStore::new(),
        tasks.clone(),
        commits.clone(),
    );
    (provider, tasks, commits)
}

/// Two task feeds: a catch-all one, and one tagged `work` whose tasks the catch-all must not mirror
pub fn tasks_config() -> Config {
    Config::from_json_str(&format!(r#"{{
        "ics_calendars": [
            {{ "link": "{}", "calendar": "Tasks", "completed_calendar": "Completed", "ignored_tags": ["work"] }},
            {{ "link": "{}", "calendar": "Work", "completed_calendar": "Completed", "color": "11", "tag": "work" }}
        ],
        "settings": {{ "sync_commits": false }}
    }}"#, ALL_FEED, WORK_FEED)).unwrap()
}

pub fn commits_config() -> Config {
    Config::from_json_str(r#"{
        "github": { "username": "john", "commits_calendar": "Commits", "ignored_repos": ["john/secret"], "parse_commit_emojis": true },
        "settings": { "sync_tasks": false, "confirmation_passes": 3 }
    }"#).unwrap()
}

pub fn day(y: i32, m: u32, d: u32) -> DateSpec {
    DateSpec::all_day(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateSpec {
    DateSpec::timed(Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(), Some("UTC".into()))
}

pub fn task(id: &str, name: &str, start: DateSpec) -> Task {
    Task::new(id.to_string(), name.to_string(), None, start.clone(), start)
}

pub fn commit(repository: &str, id: &str, date: &str, message: &str) -> Commit {
    let (owner, name) = repository.split_once('/').unwrap();
    Commit {
        commit_id: id.to_string(),
        commit_date: DateTime::parse_from_rfc3339(date).unwrap().with_timezone(&Utc),
        commit_message: message.to_string(),
        commit_url: format!("https://github.com/{}/commit/{}", repository, id),
        repository: repository.to_string(),
        repository_name: name.to_string(),
        repository_owner: owner.to_string(),
        repository_link: format!("https://github.com/{}", repository),
        is_repository_private: false,
        is_repository_fork: false,
    }
}
