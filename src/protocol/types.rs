use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, client-supplied player identifier. Honored across reconnects;
/// minted server-side (a UUID string) when a connection doesn't supply one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for PlayerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which side of the board a session is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerSide {
    White,
    Black,
    Spectator,
}

impl PlayerSide {
    /// The side a team member on `self` would be playing against; `None` for spectators.
    pub fn opponent(self) -> Option<Self> {
        match self {
            Self::White => Some(Self::Black),
            Self::Black => Some(Self::White),
            Self::Spectator => None,
        }
    }

    pub fn is_team(self) -> bool {
        matches!(self, Self::White | Self::Black)
    }
}

/// Lifecycle state of the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Lobby,
    AwaitingProposals,
    FinalizingTurn,
    Over,
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Checkmate,
    Stalemate,
    ThreefoldRepetition,
    InsufficientMaterial,
    FiftyMoveRule,
    Resignation,
    DrawAgreement,
    Timeout,
    Abandonment,
}

impl EndReason {
    /// Whether this reason ends the game in a draw (no winner) regardless of side-to-move.
    pub fn is_draw(self) -> bool {
        matches!(
            self,
            Self::Stalemate
                | Self::ThreefoldRepetition
                | Self::InsufficientMaterial
                | Self::FiftyMoveRule
                | Self::DrawAgreement
        )
    }
}

/// The three team-scoped vote kinds (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamVoteKind {
    Resign,
    OfferDraw,
    AcceptDraw,
}

/// A single move proposal submitted by a team member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub lan: String,
    pub san: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opponent_is_symmetric() {
        assert_eq!(PlayerSide::White.opponent(), Some(PlayerSide::Black));
        assert_eq!(PlayerSide::Black.opponent(), Some(PlayerSide::White));
        assert_eq!(PlayerSide::Spectator.opponent(), None);
    }

    #[test]
    fn player_id_roundtrips_through_json() {
        let id = PlayerId("abc-123".to_string());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc-123\"");
        let back: PlayerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
