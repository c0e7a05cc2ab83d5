//! The confirmation gate of the commit engine
//!
//! The commit search is eventually consistent: a commit may be missing from one answer and back in the next one.
//! The commit engine therefore only acts once the same candidate sets have been observed during
//! `confirmation_passes` consecutive runs.
//!
//! The state of the gate survives across runs in three properties, whose names and formats are shared with
//! previous versions:
//! * `github_commit_changes_count`, a string-encoded integer,
//! * `github_commits_tracked_to_be_added`, the snapshot of commits to add,
//! * `github_commits_tracked_to_be_deleted`, the snapshot of events to delete.

use std::collections::BTreeSet;

use serde_json::{json, Value};

use crate::commit::Commit;
use crate::error::{SyncError, SyncResult};
use crate::event::Event;
use crate::identity::CommitIdentity;
use crate::traits::PropertyStore;

pub const CHANGES_COUNT_KEY: &str = "github_commit_changes_count";
pub const TRACKED_TO_BE_ADDED_KEY: &str = "github_commits_tracked_to_be_added";
pub const TRACKED_TO_BE_DELETED_KEY: &str = "github_commits_tracked_to_be_deleted";

/// Where the gate stands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmationPhase {
    /// Nothing is tracked
    Idle,
    /// The snapshots have been observed this many consecutive times
    Observing(u32),
    /// The snapshots are confirmed, and must be applied now
    Committing,
}

/// The persisted state of the gate
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfirmationState {
    pub count: u32,
    pub to_add: Vec<Commit>,
    pub to_delete: Vec<Event>,
}

impl ConfirmationState {
    /// Read the state. Missing or unreadable values are read as an idle gate
    pub fn load<P: PropertyStore + ?Sized>(properties: &P) -> SyncResult<Self> {
        let count = match properties.get(CHANGES_COUNT_KEY).map_err(SyncError::property)? {
            None => 0,
            Some(value) => parse_count(&value),
        };
        let to_add = load_list(properties, TRACKED_TO_BE_ADDED_KEY)?;
        let to_delete = load_list(properties, TRACKED_TO_BE_DELETED_KEY)?;
        Ok(Self { count, to_add, to_delete })
    }

    pub fn save<P: PropertyStore + ?Sized>(&self, properties: &mut P) -> SyncResult<()> {
        let to_add = serde_json::to_value(&self.to_add).map_err(|err| SyncError::Property(err.to_string()))?;
        let to_delete = serde_json::to_value(&self.to_delete).map_err(|err| SyncError::Property(err.to_string()))?;
        properties.set(TRACKED_TO_BE_ADDED_KEY, to_add).map_err(SyncError::property)?;
        properties.set(TRACKED_TO_BE_DELETED_KEY, to_delete).map_err(SyncError::property)?;
        // The counter goes last, so that an interrupted save is seen as a mismatch by the next run
        properties.set(CHANGES_COUNT_KEY, json!(self.count.to_string())).map_err(SyncError::property)?;
        Ok(())
    }

    /// Persist an idle gate
    pub fn reset<P: PropertyStore + ?Sized>(properties: &mut P) -> SyncResult<()> {
        Self::default().save(properties)
    }

    pub fn phase(&self) -> ConfirmationPhase {
        match self.count {
            0 => ConfirmationPhase::Idle,
            n => ConfirmationPhase::Observing(n),
        }
    }
}

fn parse_count(value: &Value) -> u32 {
    let parsed = match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        _ => None,
    };
    parsed.unwrap_or_else(|| {
        log::warn!("Ignoring an invalid {}: {}", CHANGES_COUNT_KEY, value);
        0
    })
}

fn load_list<P, T>(properties: &P, key: &str) -> SyncResult<Vec<T>>
where
    P: PropertyStore + ?Sized,
    T: serde::de::DeserializeOwned,
{
    match properties.get(key).map_err(SyncError::property)? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => match serde_json::from_value(value) {
            Ok(list) => Ok(list),
            Err(err) => {
                // A snapshot that cannot be read never matches, the next comparison resets the gate
                log::warn!("Ignoring an invalid {}: {}", key, err);
                Ok(Vec::new())
            },
        },
    }
}


/// The key a commit is tracked with
pub fn commit_key(commit: &Commit) -> String {
    commit.commit_id.clone()
}

/// The key a managed commit event is tracked with
pub fn event_key(event: &Event) -> String {
    match CommitIdentity::from_event(event) {
        Some(identity) => identity.key(),
        None => event.id.clone(),
    }
}

/// Why the gate goes back to idle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetReason {
    /// There is nothing to add nor to delete
    NothingToTrack,
    /// This observation differs from the tracked snapshots
    Mismatch,
}

/// What a run must do with the gate
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    Reset(ResetReason),
    /// Start tracking these candidates
    Start(ConfirmationState),
    /// The observation matches the snapshots, that have now been seen this many times
    Advance(u32),
    /// Apply these changes, then reset
    Commit { to_add: Vec<Commit>, to_delete: Vec<Event> },
}

impl Transition {
    /// The phase the gate is in once this transition is applied (before the reset that follows a commit)
    pub fn target_phase(&self) -> ConfirmationPhase {
        match self {
            Transition::Reset(_) => ConfirmationPhase::Idle,
            Transition::Start(state) => state.phase(),
            Transition::Advance(n) => ConfirmationPhase::Observing(*n),
            Transition::Commit { .. } => ConfirmationPhase::Committing,
        }
    }
}

/// Decide what to do with this run's candidates, given the persisted state.
///
/// `passes` is the number of consecutive identical observations required before acting
pub fn next_transition(state: &ConfirmationState, to_add: &[Commit], to_delete: &[Event], passes: u32) -> Transition {
    if to_add.is_empty() && to_delete.is_empty() {
        return Transition::Reset(ResetReason::NothingToTrack);
    }

    match state.phase() {
        ConfirmationPhase::Idle if passes <= 1 => Transition::Commit { to_add: to_add.to_vec(), to_delete: to_delete.to_vec() },
        ConfirmationPhase::Idle => Transition::Start(ConfirmationState {
            count: 1,
            to_add: to_add.to_vec(),
            to_delete: to_delete.to_vec(),
        }),
        ConfirmationPhase::Observing(_) | ConfirmationPhase::Committing => {
            let added_keys: BTreeSet<String> = to_add.iter().map(commit_key).collect();
            let tracked_added_keys: BTreeSet<String> = state.to_add.iter().map(commit_key).collect();
            let deleted_keys: BTreeSet<String> = to_delete.iter().map(event_key).collect();
            let tracked_deleted_keys: BTreeSet<String> = state.to_delete.iter().map(event_key).collect();

            let same_additions = crate::utils::keys_are_the_same("commits to add", &added_keys, &tracked_added_keys);
            let same_deletions = crate::utils::keys_are_the_same("commits to delete", &deleted_keys, &tracked_deleted_keys);
            if (same_additions && same_deletions) == false {
                return Transition::Reset(ResetReason::Mismatch);
            }

            let observed = state.count + 1;
            if observed >= passes {
                // The snapshots are applied, not this observation
                Transition::Commit { to_add: state.to_add.clone(), to_delete: state.to_delete.clone() }
            } else {
                Transition::Advance(observed)
            }
        },
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::properties::MemoryPropertyStore;

    fn commit(id: &str) -> Commit {
        Commit {
            commit_id: id.into(),
            commit_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            commit_message: "m".into(),
            commit_url: format!("https://github.com/john/r/commit/{}", id),
            repository: "john/r".into(),
            repository_name: "r".into(),
            repository_owner: "john".into(),
            repository_link: "https://github.com/john/r".into(),
            is_repository_private: false,
            is_repository_fork: false,
        }
    }

    #[test]
    fn test_transition_table() {
        let idle = ConfirmationState::default();
        let candidates = vec![commit("abc")];

        assert_eq!(next_transition(&idle, &[], &[], 3), Transition::Reset(ResetReason::NothingToTrack));

        let started = match next_transition(&idle, &candidates, &[], 3) {
            Transition::Start(state) => state,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(started.phase(), ConfirmationPhase::Observing(1));

        assert_eq!(next_transition(&started, &candidates, &[], 3), Transition::Advance(2));

        let observed_twice = ConfirmationState { count: 2, ..started.clone() };
        let transition = next_transition(&observed_twice, &candidates, &[], 3);
        assert_eq!(transition.target_phase(), ConfirmationPhase::Committing);
        assert_eq!(transition, Transition::Commit { to_add: candidates.clone(), to_delete: Vec::new() });

        assert_eq!(next_transition(&started, &[commit("abc"), commit("def")], &[], 3), Transition::Reset(ResetReason::Mismatch));
        assert_eq!(next_transition(&started, &[], &[], 3), Transition::Reset(ResetReason::NothingToTrack));
    }

    #[test]
    fn test_deletions_are_compared_independently() {
        let old = crate::content::commit_event(&commit("old"), true);
        let other = crate::content::commit_event(&commit("other"), true);
        let additions = vec![commit("abc")];
        let state = ConfirmationState { count: 1, to_add: additions.clone(), to_delete: vec![old.clone()] };

        // Same additions, but the deletions changed
        assert_eq!(next_transition(&state, &additions, &[old.clone(), other.clone()], 3), Transition::Reset(ResetReason::Mismatch));
        assert_eq!(next_transition(&state, &additions, &[], 3), Transition::Reset(ResetReason::Mismatch));
        assert_eq!(next_transition(&state, &additions, &[other], 3), Transition::Reset(ResetReason::Mismatch));

        // Deletions alone are tracked like additions
        let deletions_only = ConfirmationState { count: 1, to_add: Vec::new(), to_delete: vec![old.clone()] };
        assert_eq!(next_transition(&deletions_only, &[], &[old.clone()], 3), Transition::Advance(2));
        assert_eq!(next_transition(&deletions_only, &additions, &[old.clone()], 3), Transition::Reset(ResetReason::Mismatch));

        // Both directions are confirmed together
        let observed_twice = ConfirmationState { count: 2, ..state };
        assert_eq!(
            next_transition(&observed_twice, &additions, &[old.clone()], 3),
            Transition::Commit { to_add: additions, to_delete: vec![old] },
        );
    }

    #[test]
    fn test_single_pass_commits_at_once() {
        let transition = next_transition(&ConfirmationState::default(), &[commit("abc")], &[], 1);
        assert_eq!(transition.target_phase(), ConfirmationPhase::Committing);
    }

    #[test]
    fn test_snapshot_is_applied_rather_than_observation() {
        let mut newer = commit("abc");
        newer.commit_message = "amended".into();
        let state = ConfirmationState { count: 2, to_add: vec![commit("abc")], to_delete: Vec::new() };
        match next_transition(&state, &[newer], &[], 3) {
            Transition::Commit { to_add, .. } => assert_eq!(to_add[0].commit_message, "m"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_persisted_format() {
        let mut properties = MemoryPropertyStore::new();
        assert_eq!(ConfirmationState::load(&properties).unwrap(), ConfirmationState::default());

        let state = ConfirmationState { count: 2, to_add: vec![commit("abc")], to_delete: Vec::new() };
        state.save(&mut properties).unwrap();
        assert_eq!(properties.get(CHANGES_COUNT_KEY).unwrap(), Some(json!("2")));
        let added = properties.get(TRACKED_TO_BE_ADDED_KEY).unwrap().unwrap();
        assert_eq!(added[0]["commitId"], "abc");
        assert_eq!(ConfirmationState::load(&properties).unwrap(), state);

        ConfirmationState::reset(&mut properties).unwrap();
        assert_eq!(properties.get(CHANGES_COUNT_KEY).unwrap(), Some(json!("0")));
        assert_eq!(properties.get(TRACKED_TO_BE_DELETED_KEY).unwrap(), Some(json!([])));
    }

    #[test]
    fn test_lenient_loading() {
        let mut properties = MemoryPropertyStore::new();
        properties.set(CHANGES_COUNT_KEY, json!(2)).unwrap();
        properties.set(TRACKED_TO_BE_ADDED_KEY, json!("garbage")).unwrap();
        let state = ConfirmationState::load(&properties).unwrap();
        assert_eq!(state.count, 2);
        assert!(state.to_add.is_empty());

        properties.set(CHANGES_COUNT_KEY, json!("NaN")).unwrap();
        assert_eq!(ConfirmationState::load(&properties).unwrap().phase(), ConfirmationPhase::Idle);
    }
}
