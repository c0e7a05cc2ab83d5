//! Utilities to compare custom types
//!
//! These can be used to sort results, e.g. by using `sorted_by` from the `itertools` crate

use crate::commit::Commit;

/// Compare commits by author date, newest first
pub fn compare_commits_newest_first(left: &&Commit, right: &&Commit) -> std::cmp::Ordering {
    Ord::cmp(&right.commit_date, &left.commit_date)
        .then_with(|| Ord::cmp(&left.commit_id, &right.commit_id))
}
