use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::models::Polarity;

/// VoteAction
///
/// The store mutation chosen by the vote state machine for one cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    /// No existing vote: insert a fresh row with the requested polarity.
    Insert,
    /// Existing vote with the same polarity: delete the row (toggle off).
    Remove,
    /// Existing vote with the opposite polarity: overwrite it in place.
    Flip,
}

/// VoteOutcome
///
/// What a cast did to the ledger, reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum VoteOutcome {
    Created,
    Updated,
    Removed,
}

impl VoteAction {
    pub fn outcome(self) -> VoteOutcome {
        match self {
            VoteAction::Insert => VoteOutcome::Created,
            VoteAction::Remove => VoteOutcome::Removed,
            VoteAction::Flip => VoteOutcome::Updated,
        }
    }
}

/// Decides the transition for a cast vote given the current ledger state for
/// the (user, answer) pair. Pure; the repository is responsible for reading
/// `existing` and applying the returned action atomically under the same
/// transaction.
pub fn transition(existing: Option<Polarity>, requested: Polarity) -> VoteAction {
    match existing {
        None => VoteAction::Insert,
        Some(current) if current == requested => VoteAction::Remove,
        Some(_) => VoteAction::Flip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Polarity::{Down, Up};

    #[test]
    fn first_vote_inserts() {
        assert_eq!(transition(None, Up), VoteAction::Insert);
        assert_eq!(transition(None, Down), VoteAction::Insert);
    }

    #[test]
    fn repeated_polarity_toggles_off() {
        assert_eq!(transition(Some(Up), Up), VoteAction::Remove);
        assert_eq!(transition(Some(Down), Down), VoteAction::Remove);
    }

    #[test]
    fn opposite_polarity_flips_in_place() {
        assert_eq!(transition(Some(Up), Down), VoteAction::Flip);
        assert_eq!(transition(Some(Down), Up), VoteAction::Flip);
    }

    #[test]
    fn toggle_then_recast_starts_fresh() {
        // Cast up, cast up again (row removed), cast down: the third cast
        // must see an empty ledger and insert.
        let after_first = transition(None, Up);
        assert_eq!(after_first, VoteAction::Insert);
        let after_second = transition(Some(Up), Up);
        assert_eq!(after_second, VoteAction::Remove);
        let after_third = transition(None, Down);
        assert_eq!(after_third, VoteAction::Insert);
    }

    #[test]
    fn outcomes_mirror_actions() {
        assert_eq!(VoteAction::Insert.outcome(), VoteOutcome::Created);
        assert_eq!(VoteAction::Remove.outcome(), VoteOutcome::Removed);
        assert_eq!(VoteAction::Flip.outcome(), VoteOutcome::Updated);
    }
}
