//! This crate keeps Google Calendars in sync with task manager ICS feeds and with the GitHub commits of a user.
//!
//! Each invocation is stateless: it reads the sources of truth, compares them with the events it manages
//! (recognized by the identity bag they carry, see [`identity`]), and creates, updates or moves events accordingly.
//! The only state that survives across invocations lives in a [`PropertyStore`](traits::PropertyStore).
//!
//! * Tasks are mirrored by the task reconciler ([`reconcile::tasks`]). Tasks that disappear from their feed are moved to a "completed" calendar.
//! * Commits are mirrored by the commit engine ([`reconcile::commits`]), that only acts once several consecutive
//!   runs agree on what should change (see [`reconcile::confirmation`]).
//!
//! These are run together by a [`Provider`](provider::Provider), that talks to the outside world through the traits
//! of the [`traits`] module. \
//! The [`calendar`], [`properties`] and [`sources`] modules provide implementations of these traits, either real
//! ones (Google Calendar, JSON file, HTTP readers) or in-memory ones, that are mostly useful for tests.

pub mod traits;

pub mod calendar;
pub mod properties;
pub mod sources;
pub mod ical;

mod task;
pub use task::Task;
mod commit;
pub use commit::Commit;
pub mod event;
pub use event::{DateSpec, Event, EventPatch};

pub mod config;
pub use config::Config;
pub mod error;
pub use error::{SyncError, SyncResult};

pub mod identity;
pub mod content;
pub mod emoji;
pub mod reconcile;
pub mod provider;
pub use provider::Provider;
pub use provider::session_stats::SessionStats;

pub mod mock_behaviour;
pub mod utils;
