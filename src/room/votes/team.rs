//! Team-scoped action votes: resign / offer-draw / accept-draw (spec §4.3).

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::protocol::{PlayerId, PlayerSide, TeamVoteKind};
use crate::room::timer::TimerHandle;

/// Why a team vote request was rejected before a vote was ever created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamVotePrereqRejection {
    /// A vote for this side is already in progress.
    AlreadyActive,
    /// `accept_draw` requires a pending offer from the other side.
    NoOpposingOffer,
    /// `offer_draw` requires no pending offer of either side.
    OfferAlreadyPending,
}

/// Centralizes the accept-draw auto-execute guard the source scatters across
/// multiple call sites (spec §9 item 5, resolved in SPEC_FULL §12.5): a
/// system-triggered `accept_draw` vote is never allowed to auto-execute, even
/// when the responding team has at most one connected member.
pub fn prerequisites(
    kind: TeamVoteKind,
    existing_vote_active: bool,
    draw_offer: Option<PlayerSide>,
    side: PlayerSide,
) -> Result<(), TeamVotePrereqRejection> {
    if existing_vote_active {
        return Err(TeamVotePrereqRejection::AlreadyActive);
    }
    match kind {
        TeamVoteKind::AcceptDraw => {
            if draw_offer != side.opponent() {
                return Err(TeamVotePrereqRejection::NoOpposingOffer);
            }
        }
        TeamVoteKind::OfferDraw => {
            if draw_offer.is_some() {
                return Err(TeamVotePrereqRejection::OfferAlreadyPending);
            }
        }
        TeamVoteKind::Resign => {}
    }
    Ok(())
}

/// Whether the request should skip voting and execute immediately: a solo
/// team does not need to vote against itself, but a system-triggered
/// accept-draw vote must always run its course (spec §4.3, §9 item 5).
pub fn should_auto_execute(connected_teammates: usize, system_triggered: bool) -> bool {
    connected_teammates <= 1 && !system_triggered
}

/// State of one active team vote.
#[derive(Debug)]
pub struct TeamVote {
    pub kind: TeamVoteKind,
    pub side: PlayerSide,
    pub initiator_name: String,
    pub eligible_voters: HashSet<PlayerId>,
    pub yes_voters: HashSet<PlayerId>,
    pub required: usize,
    pub system_triggered: bool,
    pub deadline: DateTime<Utc>,
    pub timer: Option<TimerHandle>,
}

impl TeamVote {
    /// Snapshot connected teammates as `eligibleVoters`; the initiator counts
    /// as yes unless the vote is system-triggered (spec §4.3 "Creation").
    pub fn new(
        kind: TeamVoteKind,
        side: PlayerSide,
        initiator: Option<(&PlayerId, &str)>,
        eligible_voters: HashSet<PlayerId>,
        system_triggered: bool,
        deadline: DateTime<Utc>,
    ) -> Self {
        let required = eligible_voters.len();
        let mut yes_voters = HashSet::new();
        let initiator_name = if let Some((pid, name)) = initiator {
            if !system_triggered {
                yes_voters.insert(pid.clone());
            }
            name.to_string()
        } else {
            String::new()
        };
        Self {
            kind,
            side,
            initiator_name,
            eligible_voters,
            yes_voters,
            required,
            system_triggered,
            deadline,
            timer: None,
        }
    }

    pub fn is_immediately_passed(&self) -> bool {
        self.yes_voters.len() >= self.required
    }
}

/// Outcome of casting one ballot (spec §4.3 "Vote processing").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamVoteStep {
    /// The voter is not a member of the snapshot taken at vote creation.
    Ineligible,
    /// A "no" vote fails the vote immediately (unanimity required).
    Failed,
    /// The required number of "yes" votes has been reached.
    Passed,
    /// The vote continues with this updated yes set.
    Continuing(HashSet<PlayerId>),
}

/// Pure tally step: given the vote's current eligible/yes sets and the
/// incoming ballot, compute the outcome without mutating any input.
pub fn cast_vote(
    eligible_voters: &HashSet<PlayerId>,
    yes_voters: &HashSet<PlayerId>,
    required: usize,
    voter: &PlayerId,
    yes: bool,
) -> TeamVoteStep {
    if !eligible_voters.contains(voter) {
        return TeamVoteStep::Ineligible;
    }
    if !yes {
        return TeamVoteStep::Failed;
    }
    let mut updated = yes_voters.clone();
    updated.insert(voter.clone());
    if updated.len() >= required {
        TeamVoteStep::Passed
    } else {
        TeamVoteStep::Continuing(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> PlayerId {
        PlayerId(s.to_string())
    }

    #[test]
    fn accept_draw_requires_opposing_offer() {
        assert_eq!(
            prerequisites(TeamVoteKind::AcceptDraw, false, None, PlayerSide::White),
            Err(TeamVotePrereqRejection::NoOpposingOffer)
        );
        assert_eq!(
            prerequisites(
                TeamVoteKind::AcceptDraw,
                false,
                Some(PlayerSide::White),
                PlayerSide::White
            ),
            Err(TeamVotePrereqRejection::NoOpposingOffer)
        );
        assert!(prerequisites(
            TeamVoteKind::AcceptDraw,
            false,
            Some(PlayerSide::Black),
            PlayerSide::White
        )
        .is_ok());
    }

    #[test]
    fn offer_draw_blocked_by_any_pending_offer() {
        assert!(prerequisites(
            TeamVoteKind::OfferDraw,
            false,
            Some(PlayerSide::Black),
            PlayerSide::White
        )
        .is_err());
    }

    #[test]
    fn solo_team_auto_executes_unless_system_triggered() {
        assert!(should_auto_execute(1, false));
        assert!(!should_auto_execute(1, true));
        assert!(!should_auto_execute(2, false));
    }

    #[test]
    fn no_vote_fails_immediately() {
        let eligible = [pid("a"), pid("b")].into_iter().collect();
        let yes = HashSet::new();
        assert_eq!(
            cast_vote(&eligible, &yes, 2, &pid("b"), false),
            TeamVoteStep::Failed
        );
    }

    #[test]
    fn unanimous_yes_passes() {
        let eligible: HashSet<_> = [pid("a"), pid("b")].into_iter().collect();
        let mut yes = HashSet::new();
        yes.insert(pid("a"));
        assert_eq!(
            cast_vote(&eligible, &yes, 2, &pid("b"), true),
            TeamVoteStep::Passed
        );
    }

    #[test]
    fn ineligible_voter_rejected() {
        let eligible: HashSet<_> = [pid("a")].into_iter().collect();
        assert_eq!(
            cast_vote(&eligible, &HashSet::new(), 1, &pid("z"), true),
            TeamVoteStep::Ineligible
        );
    }
}
