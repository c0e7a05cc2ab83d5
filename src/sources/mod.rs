//! Readers of the upstream sources of truth
//!
//! [`IcsReader`](ics::IcsReader) reads task manager ICS feeds, [`GithubReader`](github::GithubReader)
//! lists the commits of a GitHub user.

pub mod github;
pub mod ics;

/// Identifies this crate to the upstream servers
pub(crate) static USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
