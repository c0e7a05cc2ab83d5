//! The reconcilers, that decide which calendar events must be created, updated, moved or deleted
//!
//! [`tasks`] mirrors ICS feeds, [`commits`] mirrors GitHub commits behind the [`confirmation`] gate.

pub mod commits;
pub mod confirmation;
pub mod tasks;
