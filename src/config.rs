//! Configuration of a sync invocation
//!
//! The configuration is a JSON document, deserialized into statically typed structs and validated once
//! at startup by [`Config::validate`], before anything is mutated.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use chrono_tz::Tz;
use url::Url;

use crate::error::{SyncError, SyncResult};
use crate::provider::sync_progress::SyncSource;

/// How many consecutive identical observations the commit engine requires before acting
pub const DEFAULT_CONFIRMATION_PASSES: u32 = 3;

/// One week
const MAX_RUN_GUARD_MINUTES: u64 = 7 * 24 * 60;

/// Google Calendar event color ids
const VALID_COLOR_IDS: [&str; 11] = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub ics_calendars: Vec<IcsSourceConfig>,
    #[serde(default)]
    pub github: Option<GithubConfig>,
    #[serde(default)]
    pub settings: Settings,
}

/// An ICS feed, and where its tasks go
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IcsSourceConfig {
    pub link: String,
    /// The calendar active tasks are mirrored into
    pub calendar: String,
    /// The calendar tasks are moved to once they disappear from the feed
    pub completed_calendar: String,
    /// A Google Calendar color id
    #[serde(default)]
    pub color: Option<String>,
    /// Names this feed, so that catch-all feeds can exclude its tasks
    #[serde(default)]
    pub tag: Option<String>,
    /// Tags of the feeds whose tasks must be removed from this one
    #[serde(default)]
    pub ignored_tags: Vec<String>,
}

impl IcsSourceConfig {
    /// A short description of this source, suitable for logs
    /// How progress on this feed is reported
    pub fn sync_source(&self) -> SyncSource {
        SyncSource::TaskFeed { calendar: self.calendar.clone(), tag: self.tag.clone() }
    }

    pub fn descr(&self) -> String {
        match &self.tag {
            Some(tag) => format!("ICS feed [{}] -> {}", tag, self.calendar),
            None => format!("ICS feed -> {}", self.calendar),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GithubConfig {
    pub username: String,
    #[serde(default)]
    pub token: Option<String>,
    pub commits_calendar: String,
    /// Full names (`owner/name`) of repositories whose commits are never mirrored
    #[serde(default)]
    pub ignored_repos: Vec<String>,
    /// Write `:tada:` shortcodes as emojis in the events
    #[serde(default)]
    pub parse_commit_emojis: bool,
}

impl GithubConfig {
    pub fn is_ignored_repo(&self, repository: &str) -> bool {
        self.ignored_repos.iter().any(|r| r.eq_ignore_ascii_case(repository))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_true")]
    pub sync_tasks: bool,
    #[serde(default = "default_true")]
    pub sync_commits: bool,
    #[serde(default = "default_confirmation_passes")]
    pub confirmation_passes: u32,
    /// Time zone of ICS times that carry neither `Z` nor `TZID`
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    /// When set, a run refuses to start if another one started less than this many minutes ago and has not finished
    #[serde(default)]
    pub run_guard_minutes: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sync_tasks: true,
            sync_commits: true,
            confirmation_passes: DEFAULT_CONFIRMATION_PASSES,
            default_timezone: default_timezone(),
            run_guard_minutes: None,
        }
    }
}

fn default_true() -> bool { true }
fn default_confirmation_passes() -> u32 { DEFAULT_CONFIRMATION_PASSES }
fn default_timezone() -> String { String::from("UTC") }


impl Config {
    /// Read a configuration file. This does not validate it, see [`Config::validate`]
    pub fn from_file(path: &Path) -> SyncResult<Self> {
        let file = std::fs::File::open(path)
            .map_err(|err| SyncError::ConfigInvalid(format!("unable to open {:?}: {}", path, err)))?;
        serde_json::from_reader(file)
            .map_err(|err| SyncError::ConfigInvalid(format!("unable to parse {:?}: {}", path, err)))
    }

    pub fn from_json_str(content: &str) -> SyncResult<Self> {
        serde_json::from_str(content)
            .map_err(|err| SyncError::ConfigInvalid(err.to_string()))
    }

    /// Whether the task reconciler must run
    pub fn tasks_enabled(&self) -> bool {
        self.settings.sync_tasks && self.ics_calendars.is_empty() == false
    }

    /// The GitHub configuration, if the commit engine must run
    pub fn commits_config(&self) -> Option<&GithubConfig> {
        if self.settings.sync_commits == false {
            return None;
        }
        self.github.as_ref()
    }

    /// The zone floating ICS times are interpreted in
    pub fn default_timezone(&self) -> Tz {
        self.settings.default_timezone.parse().unwrap_or(Tz::UTC)
    }

    /// Every calendar the enabled sources write to
    pub fn managed_calendars(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        if self.tasks_enabled() {
            for source in &self.ics_calendars {
                names.insert(source.calendar.clone());
                names.insert(source.completed_calendar.clone());
            }
        }
        if let Some(github) = self.commits_config() {
            names.insert(github.commits_calendar.clone());
        }
        names
    }

    /// Check the configuration is usable.
    ///
    /// This has no side effect, and reports the first problem found
    pub fn validate(&self) -> SyncResult<()> {
        let invalid = |msg: String| -> SyncResult<()> { Err(SyncError::ConfigInvalid(msg)) };

        if self.settings.confirmation_passes == 0 {
            return invalid("settings.confirmation_passes must be at least 1".to_string());
        }
        if let Some(minutes) = self.settings.run_guard_minutes {
            if minutes == 0 || minutes > MAX_RUN_GUARD_MINUTES {
                return invalid(format!("settings.run_guard_minutes must be between 1 and {}", MAX_RUN_GUARD_MINUTES));
            }
        }
        if self.settings.default_timezone.parse::<Tz>().is_err() {
            return invalid(format!("unknown time zone '{}'", self.settings.default_timezone));
        }

        let mut tags = BTreeSet::new();
        for (index, source) in self.ics_calendars.iter().enumerate() {
            if source.link.trim().is_empty() {
                return invalid(format!("ics_calendars[{}]: empty link", index));
            }
            if let Err(err) = Url::parse(&source.link) {
                return invalid(format!("ics_calendars[{}]: invalid link '{}' ({})", index, source.link, err));
            }
            if source.calendar.trim().is_empty() || source.completed_calendar.trim().is_empty() {
                return invalid(format!("ics_calendars[{}]: calendar names must not be empty", index));
            }
            if let Some(color) = &source.color {
                if VALID_COLOR_IDS.contains(&color.as_str()) == false {
                    return invalid(format!("ics_calendars[{}]: invalid color id '{}'", index, color));
                }
            }
            if source.tag.is_some() && source.ignored_tags.is_empty() == false {
                return invalid(format!("ics_calendars[{}]: a feed cannot have both a tag and ignored tags", index));
            }
            if let Some(tag) = &source.tag {
                if tags.insert(tag.clone()) == false {
                    return invalid(format!("ics_calendars[{}]: duplicated tag '{}'", index, tag));
                }
            }
        }
        for (index, source) in self.ics_calendars.iter().enumerate() {
            for ignored in &source.ignored_tags {
                if tags.contains(ignored) == false {
                    return invalid(format!("ics_calendars[{}]: ignored tag '{}' is not declared by any feed", index, ignored));
                }
            }
        }

        if self.settings.sync_commits {
            if let Some(github) = &self.github {
                if github.username.trim().is_empty() {
                    return invalid("github.username must not be empty".to_string());
                }
                if github.commits_calendar.trim().is_empty() {
                    return invalid("github.commits_calendar must not be empty".to_string());
                }
            }
        }

        Ok(())
    }
}


#[cfg(test)]
mod test {
    use super::*;

    const EXAMPLE_CONFIG: &str = r#"{
        "ics_calendars": [
            { "link": "https://ticktick.com/pub/calendar/feeds/work.ics", "calendar": "Work", "completed_calendar": "Done", "color": "5", "tag": "work" },
            { "link": "https://ticktick.com/pub/calendar/feeds/all.ics", "calendar": "Tasks", "completed_calendar": "Done", "ignored_tags": ["work"] }
        ],
        "github": { "username": "john", "commits_calendar": "Commits", "ignored_repos": ["john/dotfiles"], "parse_commit_emojis": true },
        "settings": { "default_timezone": "America/Sao_Paulo" }
    }"#;

    #[test]
    fn test_parse_and_validate() {
        let config = Config::from_json_str(EXAMPLE_CONFIG).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.settings.confirmation_passes, 3);
        assert!(config.settings.sync_tasks);
        assert_eq!(config.default_timezone(), chrono_tz::America::Sao_Paulo);

        let names: Vec<String> = config.managed_calendars().into_iter().collect();
        assert_eq!(names, vec!["Commits", "Done", "Tasks", "Work"]);
        assert!(config.github.as_ref().unwrap().is_ignored_repo("John/Dotfiles"));
    }

    #[test]
    fn test_invalid_configs() {
        let base = Config::from_json_str(EXAMPLE_CONFIG).unwrap();

        let mut config = base.clone();
        config.ics_calendars[0].color = Some("12".into());
        assert_eq!(config.validate().unwrap_err().kind(), "config_invalid");

        let mut config = base.clone();
        config.ics_calendars[1].ignored_tags = vec!["home".into()];
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.ics_calendars[0].ignored_tags = vec!["work".into()];
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.ics_calendars[1].link = "not a url".into();
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.settings.confirmation_passes = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.github.as_mut().unwrap().username = " ".into();
        assert!(config.validate().is_err());
        config.settings.sync_commits = false;
        assert!(config.validate().is_ok());
        assert!(config.commits_config().is_none());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(Config::from_json_str(r#"{ "ics_calendar": [] }"#).is_err());
        let empty = Config::from_json_str("{}").unwrap();
        assert!(empty.validate().is_ok());
        assert!(empty.tasks_enabled() == false);
    }
}
