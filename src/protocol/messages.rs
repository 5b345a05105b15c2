use serde::{Deserialize, Serialize};

use super::error_codes::ErrorCode;
use super::types::{EndReason, PlayerId, PlayerSide, RoomStatus, TeamVoteKind};

/// Messages accepted from a connection (spec §6 inbound events).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    SetName(String),
    JoinSide { side: PlayerSide },
    PlayMove(String),
    ChatMessage(String),
    StartTeamVote { vote_type: TeamVoteKind },
    VoteTeam { yes: bool },
    StartKickVote { target: PlayerId },
    VoteKick { yes: bool },
    StartResetVote,
    VoteReset { yes: bool },
    Disconnect,
    /// Keepalive; answered with `ServerMessage::Pong` (spec §11 supplement).
    Ping,
}

/// One entry of the room roster (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub name: String,
    pub connected: bool,
}

/// A move proposal as seen on the wire, tagged with its author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalEntry {
    pub id: PlayerId,
    pub name: String,
    pub lan: String,
    pub san: String,
}

/// Messages emitted by the room. Broadcast to every connected socket unless
/// documented otherwise (spec §6 outbound events).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// Sent only to the originating socket on connect.
    Session {
        id: PlayerId,
        name: String,
    },
    Players {
        spectators: Vec<RosterEntry>,
        white_players: Vec<RosterEntry>,
        black_players: Vec<RosterEntry>,
    },
    GameStatusUpdate {
        status: RoomStatus,
    },
    GameStarted {
        move_number: u32,
        side: PlayerSide,
        proposals: Vec<ProposalEntry>,
    },
    MoveSubmitted {
        id: PlayerId,
        name: String,
        move_number: u32,
        side: PlayerSide,
        lan: String,
        san: String,
    },
    MoveSelected {
        id: PlayerId,
        name: String,
        move_number: u32,
        side: PlayerSide,
        lan: String,
        san: String,
        fen: String,
        candidates: Vec<ProposalEntry>,
    },
    TurnChange {
        move_number: u32,
        side: PlayerSide,
    },
    PositionUpdate {
        fen: String,
    },
    ClockUpdate {
        white_time: i32,
        black_time: i32,
    },
    DrawOfferUpdate {
        side: Option<PlayerSide>,
    },
    /// Team-scoped; only broadcast to the side the vote belongs to.
    TeamVoteUpdate {
        is_active: bool,
        vote_type: TeamVoteKind,
        initiator_name: String,
        yes_votes: Vec<PlayerId>,
        required_votes: usize,
        end_time: chrono::DateTime<chrono::Utc>,
    },
    /// Personalized per-viewer; `my_vote_eligible`/`my_current_vote`/`am_target` are
    /// computed relative to the recipient before this message is sent to them.
    KickVoteUpdate {
        is_active: bool,
        target_id: PlayerId,
        target_name: String,
        yes_votes: usize,
        no_votes: usize,
        required_votes: usize,
        end_time: chrono::DateTime<chrono::Utc>,
        my_vote_eligible: bool,
        my_current_vote: Option<bool>,
        am_target: bool,
    },
    /// Personalized per-viewer; `my_vote_eligible`/`my_current_vote` are computed
    /// relative to the recipient before this message is sent to them.
    ResetVoteUpdate {
        is_active: bool,
        yes_votes: usize,
        required_votes: usize,
        end_time: chrono::DateTime<chrono::Utc>,
        my_vote_eligible: bool,
        my_current_vote: Option<bool>,
    },
    /// Sent only to the kicked player's connection(s).
    Kicked {
        message: String,
    },
    GameReset,
    GameOver {
        reason: EndReason,
        winner: Option<PlayerSide>,
        pgn: String,
    },
    ChatMessage {
        sender: String,
        sender_id: Option<PlayerId>,
        message: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        system: bool,
    },
    Pong,
    /// Validation/eligibility error, returned only to the submitting connection;
    /// never broadcast (spec §7) — except `EngineUnavailable`, which has no
    /// single submitter and goes out to the whole room alongside the
    /// `GameStatusUpdate` revert it accompanies.
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl ServerMessage {
    pub fn system_chat(message: impl Into<String>) -> Self {
        Self::ChatMessage {
            sender: "system".to_string(),
            sender_id: None,
            message: message.into(),
            system: true,
        }
    }

    pub fn error(code: ErrorCode) -> Self {
        Self::Error {
            message: code.description().to_string(),
            code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_tag_shape() {
        let msg = ClientMessage::PlayMove("e2e4".to_string());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "PlayMove");
        assert_eq!(json["data"], "e2e4");
    }

    #[test]
    fn system_chat_sets_flag() {
        let msg = ServerMessage::system_chat("P1 resigns");
        match msg {
            ServerMessage::ChatMessage { system, sender, .. } => {
                assert!(system);
                assert_eq!(sender, "system");
            }
            _ => panic!("expected ChatMessage"),
        }
    }
}
