//! Stateless predicates shared by the turn coordinator and the session
//! manager: turn finalization, team abandonment, and clock eligibility
//! (spec §2 "Pure rule modules", §4.1, §4.6, invariant 2).

use std::collections::{HashMap, HashSet};

use crate::protocol::{PlayerId, Proposal, RoomStatus};

/// True iff every online member of the active team has submitted a proposal
/// this turn (spec §4.1 "finalization check"). Offline teammates' prior
/// proposals still count toward the engine's candidate list, but not toward
/// this predicate.
pub fn should_finalize(
    status: RoomStatus,
    active_side_online: &[PlayerId],
    proposals: &HashMap<PlayerId, Proposal>,
) -> bool {
    status == RoomStatus::AwaitingProposals
        && !active_side_online.is_empty()
        && active_side_online.iter().all(|pid| proposals.contains_key(pid))
}

/// The clock runs only while proposals are being collected and both teams
/// have at least one committed member (invariant 2).
pub fn clock_should_run(status: RoomStatus, white_ids: &HashSet<PlayerId>, black_ids: &HashSet<PlayerId>) -> bool {
    status == RoomStatus::AwaitingProposals && !white_ids.is_empty() && !black_ids.is_empty()
}

/// A mid-game team whose committed membership has dropped to zero has
/// abandoned the game (spec §4.6 "Disconnect").
pub fn is_abandoned(status: RoomStatus, white_ids: &HashSet<PlayerId>, black_ids: &HashSet<PlayerId>) -> bool {
    matches!(status, RoomStatus::AwaitingProposals | RoomStatus::FinalizingTurn)
        && (white_ids.is_empty() || black_ids.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> PlayerId {
        PlayerId(s.to_string())
    }

    #[test]
    fn finalizes_when_all_online_proposed() {
        let mut proposals = HashMap::new();
        proposals.insert(
            pid("a"),
            Proposal {
                lan: "e2e4".into(),
                san: "e4".into(),
                name: "A".into(),
            },
        );
        assert!(should_finalize(
            RoomStatus::AwaitingProposals,
            &[pid("a")],
            &proposals
        ));
    }

    #[test]
    fn does_not_finalize_with_missing_proposal() {
        let proposals = HashMap::new();
        assert!(!should_finalize(
            RoomStatus::AwaitingProposals,
            &[pid("a")],
            &proposals
        ));
    }

    #[test]
    fn offline_proposer_does_not_block_finalization() {
        // Only online pids are checked against `proposals`; an offline
        // teammate's absence from `active_side_online` is the session
        // manager's job, not this predicate's.
        let mut proposals = HashMap::new();
        proposals.insert(
            pid("a"),
            Proposal {
                lan: "e2e4".into(),
                san: "e4".into(),
                name: "A".into(),
            },
        );
        assert!(should_finalize(
            RoomStatus::AwaitingProposals,
            &[pid("a")],
            &proposals
        ));
    }

    #[test]
    fn clock_requires_both_teams_nonempty() {
        let white: HashSet<_> = [pid("a")].into_iter().collect();
        let black = HashSet::new();
        assert!(!clock_should_run(
            RoomStatus::AwaitingProposals,
            &white,
            &black
        ));
    }

    #[test]
    fn abandonment_triggers_on_empty_team_mid_game() {
        let white: HashSet<_> = [pid("a")].into_iter().collect();
        let black = HashSet::new();
        assert!(is_abandoned(RoomStatus::AwaitingProposals, &white, &black));
        assert!(!is_abandoned(RoomStatus::Lobby, &white, &black));
    }
}
