//! This module handles conversion from iCal feeds to [`Task`](crate::task::Task)s
//!
//! It is a wrapper around the `ical` crate, which tokenizes the feed, while this module interprets
//! the few properties the sync engine consumes.

mod parser;
pub use parser::parse;
pub use parser::parse_date_property;
