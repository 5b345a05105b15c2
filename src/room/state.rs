//! The room's single mutable record (spec §3). Every field here is owned
//! exclusively by the [`crate::room::actor::RoomActor`] task; nothing else in
//! the crate ever sees a `&mut RoomState`.
//!
//! ```text
//!      Lobby ──first white proposal, black non-empty──▶ AwaitingProposals
//!        ▲                                                     │
//!        │ reset (preserves only blacklist)                    │ all online
//!        │                                                      │ active-team
//!        │                                                pids proposed
//!        │                                                      ▼
//!        └──────────────────────────── Over ◀── FinalizingTurn
//!                         game-over reason reached      │
//!                                                        │ otherwise
//!                                                        └──▶ AwaitingProposals
//! ```

use std::collections::{HashMap, HashSet};

use crate::chess::Board;
use crate::protocol::{EndReason, PlayerId, PlayerSide, Proposal, RoomStatus};
use crate::room::votes::kick::KickVote;
use crate::room::votes::reset::ResetVote;
use crate::room::votes::team::TeamVote;

/// The full state of one room (spec §3 "Room state"). Field visibility is
/// `pub(crate)` in spirit but kept `pub` within the crate boundary since only
/// `room::actor` ever constructs or mutates one.
pub struct RoomState {
    pub white_ids: HashSet<PlayerId>,
    pub black_ids: HashSet<PlayerId>,
    pub side: PlayerSide,
    pub move_number: u32,
    pub proposals: HashMap<PlayerId, Proposal>,
    pub white_time: i32,
    pub black_time: i32,
    pub chess: Board,
    pub status: RoomStatus,
    pub end_reason: Option<EndReason>,
    pub end_winner: Option<PlayerSide>,
    pub draw_offer: Option<PlayerSide>,
    pub white_vote: Option<TeamVote>,
    pub black_vote: Option<TeamVote>,
    pub kick_vote: Option<KickVote>,
    pub reset_vote: Option<ResetVote>,
    /// Survives resets (invariant 10, spec §4.5 "Creation").
    pub blacklist: HashSet<PlayerId>,
}

impl RoomState {
    /// A fresh lobby with an empty blacklist.
    pub fn new(default_clock_seconds: u32) -> Self {
        Self::with_blacklist(default_clock_seconds, HashSet::new())
    }

    /// Rebuild the room, keeping only `blacklist` (spec §4.5 "On pass", invariant 10,
    /// testable property 6: "After a reset, only blacklist survives").
    pub fn reset(&mut self, default_clock_seconds: u32) {
        let blacklist = std::mem::take(&mut self.blacklist);
        *self = Self::with_blacklist(default_clock_seconds, blacklist);
    }

    fn with_blacklist(default_clock_seconds: u32, blacklist: HashSet<PlayerId>) -> Self {
        let time = default_clock_seconds as i32;
        Self {
            white_ids: HashSet::new(),
            black_ids: HashSet::new(),
            side: PlayerSide::White,
            move_number: 1,
            proposals: HashMap::new(),
            white_time: time,
            black_time: time,
            chess: Board::new(),
            status: RoomStatus::Lobby,
            end_reason: None,
            end_winner: None,
            draw_offer: None,
            white_vote: None,
            black_vote: None,
            kick_vote: None,
            reset_vote: None,
            blacklist,
        }
    }

    pub fn team_ids(&self, side: PlayerSide) -> Option<&HashSet<PlayerId>> {
        match side {
            PlayerSide::White => Some(&self.white_ids),
            PlayerSide::Black => Some(&self.black_ids),
            PlayerSide::Spectator => None,
        }
    }

    pub fn team_ids_mut(&mut self, side: PlayerSide) -> Option<&mut HashSet<PlayerId>> {
        match side {
            PlayerSide::White => Some(&mut self.white_ids),
            PlayerSide::Black => Some(&mut self.black_ids),
            PlayerSide::Spectator => None,
        }
    }

    pub fn team_vote(&self, side: PlayerSide) -> Option<&TeamVote> {
        match side {
            PlayerSide::White => self.white_vote.as_ref(),
            PlayerSide::Black => self.black_vote.as_ref(),
            PlayerSide::Spectator => None,
        }
    }

    pub fn team_vote_slot(&mut self, side: PlayerSide) -> &mut Option<TeamVote> {
        match side {
            PlayerSide::White => &mut self.white_vote,
            PlayerSide::Black => &mut self.black_vote,
            PlayerSide::Spectator => unreachable!("spectators never hold a team vote"),
        }
    }

    pub fn clock_snapshot(&self) -> crate::room::clock::ClockSnapshot {
        crate::room::clock::ClockSnapshot {
            white_time: self.white_time,
            black_time: self.black_time,
        }
    }

    pub fn remaining_time(&self, side: PlayerSide) -> i32 {
        match side {
            PlayerSide::White => self.white_time,
            PlayerSide::Black => self.black_time,
            PlayerSide::Spectator => 0,
        }
    }

    pub fn set_remaining_time(&mut self, side: PlayerSide, value: i32) {
        match side {
            PlayerSide::White => self.white_time = value,
            PlayerSide::Black => self.black_time = value,
            PlayerSide::Spectator => {}
        }
    }

    pub fn is_over(&self) -> bool {
        self.status == RoomStatus::Over
    }

    /// Cancel every outstanding timer this state currently owns (spec §5
    /// "clearGameState-timers": walk `timerInterval`, `whiteVote.timer`,
    /// `blackVote.timer`, `kickVote.timer`, `resetVote.timer`).
    pub fn cancel_vote_timers(&mut self) {
        if let Some(vote) = &self.white_vote {
            if let Some(timer) = &vote.timer {
                timer.cancel();
            }
        }
        if let Some(vote) = &self.black_vote {
            if let Some(timer) = &vote.timer {
                timer.cancel();
            }
        }
        if let Some(vote) = &self.kick_vote {
            if let Some(timer) = &vote.timer {
                timer.cancel();
            }
        }
        if let Some(vote) = &self.reset_vote {
            if let Some(timer) = &vote.timer {
                timer.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_room_starts_in_lobby_with_configured_clock() {
        let state = RoomState::new(600);
        assert_eq!(state.status, RoomStatus::Lobby);
        assert_eq!(state.white_time, 600);
        assert_eq!(state.black_time, 600);
        assert!(state.proposals.is_empty());
    }

    #[test]
    fn reset_preserves_only_blacklist() {
        let mut state = RoomState::new(600);
        state.blacklist.insert(PlayerId("banned".into()));
        state.white_ids.insert(PlayerId("a".into()));
        state.move_number = 7;
        state.status = RoomStatus::Over;

        state.reset(600);

        assert_eq!(state.status, RoomStatus::Lobby);
        assert_eq!(state.move_number, 1);
        assert!(state.white_ids.is_empty());
        assert!(state.blacklist.contains(&PlayerId("banned".into())));
    }
}
