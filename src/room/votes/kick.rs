//! Process-wide kick vote (spec §4.4).

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::protocol::PlayerId;
use crate::room::timer::TimerHandle;

/// Strict majority of the connected snapshot, including the target
/// (spec invariant 8: `required = floor(total/2) + 1`).
pub fn required_votes(total: usize) -> usize {
    total / 2 + 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KickVotePrereqRejection {
    AlreadyActive,
    CannotTargetSelf,
    TargetNotConnected,
}

pub fn prerequisites(
    existing_vote_active: bool,
    initiator: &PlayerId,
    target: &PlayerId,
    target_connected: bool,
) -> Result<(), KickVotePrereqRejection> {
    if existing_vote_active {
        return Err(KickVotePrereqRejection::AlreadyActive);
    }
    if initiator == target {
        return Err(KickVotePrereqRejection::CannotTargetSelf);
    }
    if !target_connected {
        return Err(KickVotePrereqRejection::TargetNotConnected);
    }
    Ok(())
}

#[derive(Debug)]
pub struct KickVote {
    pub target: PlayerId,
    pub target_name: String,
    pub eligible_voters: HashSet<PlayerId>,
    pub required: usize,
    pub yes: HashSet<PlayerId>,
    pub no: HashSet<PlayerId>,
    pub deadline: DateTime<Utc>,
    pub timer: Option<TimerHandle>,
}

impl KickVote {
    /// `connected` is the snapshot of everyone online, including the target
    /// (spec §4.4 "Creation").
    pub fn new(
        initiator: &PlayerId,
        target: PlayerId,
        target_name: String,
        connected: &HashSet<PlayerId>,
        deadline: DateTime<Utc>,
    ) -> Self {
        let required = required_votes(connected.len());
        let mut eligible_voters = connected.clone();
        eligible_voters.remove(&target);
        let mut yes = HashSet::new();
        yes.insert(initiator.clone());
        Self {
            target,
            target_name,
            eligible_voters,
            required,
            yes,
            no: HashSet::new(),
            deadline,
            timer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KickVoteStep {
    Ineligible,
    /// Duplicate ballot for the same choice; silent no-op (spec §7, §8).
    NoOp,
    EarlyPass,
    EarlyFail,
    /// Vote continues with these updated yes/no sets.
    Continuing(HashSet<PlayerId>, HashSet<PlayerId>),
}

/// Pure tally step implementing vote-switching, duplicate suppression, and
/// early pass/fail detection (spec §4.4 "Vote processing").
#[allow(clippy::too_many_arguments)]
pub fn cast_vote(
    eligible_voters: &HashSet<PlayerId>,
    yes: &HashSet<PlayerId>,
    no: &HashSet<PlayerId>,
    required: usize,
    voter: &PlayerId,
    vote_yes: bool,
) -> KickVoteStep {
    if !eligible_voters.contains(voter) {
        return KickVoteStep::Ineligible;
    }

    let already_yes = yes.contains(voter);
    let already_no = no.contains(voter);
    if (vote_yes && already_yes) || (!vote_yes && already_no) {
        return KickVoteStep::NoOp;
    }

    let mut new_yes = yes.clone();
    let mut new_no = no.clone();
    if vote_yes {
        new_yes.insert(voter.clone());
        new_no.remove(voter);
    } else {
        new_no.insert(voter.clone());
        new_yes.remove(voter);
    }

    if new_yes.len() >= required {
        return KickVoteStep::EarlyPass;
    }
    if eligible_voters.len() - new_no.len() < required {
        return KickVoteStep::EarlyFail;
    }
    KickVoteStep::Continuing(new_yes, new_no)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> PlayerId {
        PlayerId(s.to_string())
    }

    #[test]
    fn required_votes_boundary_table() {
        assert_eq!(required_votes(2), 2);
        assert_eq!(required_votes(3), 2);
        assert_eq!(required_votes(4), 3);
        assert_eq!(required_votes(5), 3);
    }

    #[test]
    fn majority_pass_scenario() {
        // 5 connected, initiator=p1, target=p5. Eligible={p1..p4}, required=3.
        let eligible: HashSet<_> = [pid("p1"), pid("p2"), pid("p3"), pid("p4")]
            .into_iter()
            .collect();
        let mut yes = HashSet::new();
        yes.insert(pid("p1"));
        let no = HashSet::new();

        let step = cast_vote(&eligible, &yes, &no, 3, &pid("p2"), true);
        let KickVoteStep::Continuing(yes2, no2) = step else {
            panic!("expected continuing")
        };
        assert_eq!(yes2.len(), 2);
        assert!(no2.is_empty());

        let step = cast_vote(&eligible, &yes2, &no2, 3, &pid("p3"), true);
        assert_eq!(step, KickVoteStep::EarlyPass);
    }

    #[test]
    fn early_fail_scenario() {
        // 5 connected, required=3, eligible=4. p2 no, then p3 no -> 4-2=2<3 fail.
        let eligible: HashSet<_> = [pid("p1"), pid("p2"), pid("p3"), pid("p4")]
            .into_iter()
            .collect();
        let yes: HashSet<_> = [pid("p1")].into_iter().collect();
        let no = HashSet::new();

        let step = cast_vote(&eligible, &yes, &no, 3, &pid("p2"), false);
        let KickVoteStep::Continuing(yes2, no2) = step else {
            panic!("expected continuing")
        };

        let step = cast_vote(&eligible, &yes2, &no2, 3, &pid("p3"), false);
        assert_eq!(step, KickVoteStep::EarlyFail);
    }

    #[test]
    fn duplicate_vote_is_noop() {
        let eligible: HashSet<_> = [pid("p1")].into_iter().collect();
        let yes: HashSet<_> = [pid("p1")].into_iter().collect();
        assert_eq!(
            cast_vote(&eligible, &yes, &HashSet::new(), 1, &pid("p1"), true),
            KickVoteStep::NoOp
        );
    }
}
