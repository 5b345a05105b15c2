use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for structured error handling (spec §7).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Move / turn validation errors
    IllegalMove,
    IllegalFormat,
    NotYourTurn,
    AlreadyMoved,
    NotAcceptingProposals,
    OnlyWhiteCanStart,
    BothTeamsRequired,

    // Vote errors
    VoteAlreadyActive,
    VoteIneligibleJoinedLate,
    TargetNotFound,
    CannotVoteSelf,
    NoOpposingDrawOffer,
    DrawOfferAlreadyPending,

    // Connection errors
    Blacklisted,

    // Server errors
    InternalError,
    EngineUnavailable,
}

impl ErrorCode {
    /// Human-readable description suitable for surfacing to a client.
    pub fn description(&self) -> &'static str {
        match self {
            Self::IllegalMove => {
                "That move is not legal in the current position."
            }
            Self::IllegalFormat => {
                "That move string could not be parsed as long algebraic notation."
            }
            Self::NotYourTurn => "It is not your team's turn to move.",
            Self::AlreadyMoved => "You have already submitted a proposal for this turn.",
            Self::NotAcceptingProposals => {
                "The room is not currently accepting move proposals."
            }
            Self::OnlyWhiteCanStart => {
                "Only a member of the white team can submit the game's opening move."
            }
            Self::BothTeamsRequired => {
                "Both teams must have at least one member before the game can start."
            }
            Self::VoteAlreadyActive => "A vote of this kind is already in progress.",
            Self::VoteIneligibleJoinedLate => {
                "You joined after this vote began and are not eligible to cast a ballot."
            }
            Self::TargetNotFound => "The specified target is not a connected player.",
            Self::CannotVoteSelf => "You cannot start a kick vote against yourself.",
            Self::NoOpposingDrawOffer => {
                "There is no pending draw offer from the other team to accept."
            }
            Self::DrawOfferAlreadyPending => "A draw offer is already pending.",
            Self::Blacklisted => "This identity has been removed from the room.",
            Self::InternalError => "An internal server error occurred.",
            Self::EngineUnavailable => "The analysis engine is not currently available.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_shape() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::AlreadyMoved).unwrap(),
            "\"ALREADY_MOVED\""
        );
    }

    #[test]
    fn test_display_uses_description() {
        let error = ErrorCode::NotYourTurn;
        assert_eq!(format!("{error}"), error.description());
    }
}
