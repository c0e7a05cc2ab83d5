//! Some utility functions

use std::collections::BTreeSet;

pub mod comparison;

/// Remove the backslash escapes of an ICS `TEXT` value (`\,`, `\;`, `\\`, `\n`)
pub fn unescape_ics_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => result.push('\n'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}

/// Keys that are only in `left`, and keys that are only in `right`
pub fn symmetric_difference(left: &BTreeSet<String>, right: &BTreeSet<String>) -> (Vec<String>, Vec<String>) {
    let only_left = left.difference(right).cloned().collect();
    let only_right = right.difference(left).cloned().collect();
    (only_left, only_right)
}

/// Compare two sets of keys for equality, and log the differences if any
pub fn keys_are_the_same(descr: &str, left: &BTreeSet<String>, right: &BTreeSet<String>) -> bool {
    let (only_left, only_right) = symmetric_difference(left, right);
    if only_left.is_empty() && only_right.is_empty() {
        return true;
    }

    log::debug!("Keys of {} mismatch", descr);
    for key in only_left {
        log::debug!("   only in the current observation: {}", key);
    }
    for key in only_right {
        log::debug!("   only in the tracked snapshot:    {}", key);
    }
    false
}
