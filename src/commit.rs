//! Commits, as read from the GitHub commit search

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// A commit authored by the configured user.
///
/// Field names are serialized in camelCase, since lists of commits are persisted in the property store
/// and must stay readable by older and newer versions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Trailing path segment of the commit web URL
    pub commit_id: String,
    /// Author date
    pub commit_date: DateTime<Utc>,
    /// First line of the commit message
    pub commit_message: String,
    pub commit_url: String,
    /// Full repository name (`owner/name`)
    pub repository: String,
    pub repository_name: String,
    pub repository_owner: String,
    pub repository_link: String,
    #[serde(default)]
    pub is_repository_private: bool,
    #[serde(default)]
    pub is_repository_fork: bool,
}

impl Commit {
    /// Extract the commit id from its web URL (`https://github.com/o/r/commit/<id>`)
    pub fn id_from_url(url: &str) -> Option<&str> {
        url.rsplit_once("commit/")
            .map(|(_, id)| id.trim_end_matches('/'))
            .filter(|id| id.is_empty() == false && id.contains('/') == false)
    }

    /// Whether this commit belongs to a repository owned by `username`
    pub fn is_owned_by(&self, username: &str) -> bool {
        self.repository_owner.eq_ignore_ascii_case(username)
    }
}
