//! Process-wide, unanimous reset vote (spec §4.5).

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::protocol::PlayerId;
use crate::room::timer::TimerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetVotePrereqRejection {
    AlreadyActive,
}

pub fn prerequisites(existing_vote_active: bool) -> Result<(), ResetVotePrereqRejection> {
    if existing_vote_active {
        return Err(ResetVotePrereqRejection::AlreadyActive);
    }
    Ok(())
}

#[derive(Debug)]
pub struct ResetVote {
    pub eligible_voters: HashSet<PlayerId>,
    pub yes: HashSet<PlayerId>,
    pub required: usize,
    pub deadline: DateTime<Utc>,
    pub timer: Option<TimerHandle>,
}

impl ResetVote {
    /// Unanimous among everyone connected at snapshot time (spec invariant 7).
    pub fn new(initiator: &PlayerId, connected: HashSet<PlayerId>, deadline: DateTime<Utc>) -> Self {
        let required = connected.len();
        let mut yes = HashSet::new();
        yes.insert(initiator.clone());
        Self {
            eligible_voters: connected,
            yes,
            required,
            deadline,
            timer: None,
        }
    }

    /// Solo user: `|yes| >= required` immediately, so the caller skips the
    /// vote entirely and resets directly (spec §4.5 "Creation").
    pub fn is_immediately_passed(&self) -> bool {
        self.yes.len() >= self.required
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetVoteStep {
    Ineligible,
    NoOp,
    Failed,
    Passed,
    Continuing(HashSet<PlayerId>),
}

/// Pure tally step: any "no" fails immediately, "yes" passes once unanimous.
pub fn cast_vote(
    eligible_voters: &HashSet<PlayerId>,
    yes_voters: &HashSet<PlayerId>,
    required: usize,
    voter: &PlayerId,
    vote_yes: bool,
) -> ResetVoteStep {
    if !eligible_voters.contains(voter) {
        return ResetVoteStep::Ineligible;
    }
    if !vote_yes {
        return ResetVoteStep::Failed;
    }
    if yes_voters.contains(voter) {
        return ResetVoteStep::NoOp;
    }
    let mut updated = yes_voters.clone();
    updated.insert(voter.clone());
    if updated.len() >= required {
        ResetVoteStep::Passed
    } else {
        ResetVoteStep::Continuing(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> PlayerId {
        PlayerId(s.to_string())
    }

    #[test]
    fn solo_user_auto_passes() {
        let mut connected = HashSet::new();
        connected.insert(pid("solo"));
        let vote = ResetVote::new(&pid("solo"), connected, Utc::now());
        assert!(vote.is_immediately_passed());
    }

    #[test]
    fn any_no_fails_immediately() {
        let eligible: HashSet<_> = [pid("a"), pid("b")].into_iter().collect();
        assert_eq!(
            cast_vote(&eligible, &HashSet::new(), 2, &pid("b"), false),
            ResetVoteStep::Failed
        );
    }
}
