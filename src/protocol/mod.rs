//! Wire protocol: inbound/outbound message shapes and the room's error vocabulary.

pub mod error_codes;
pub mod messages;
pub mod types;

pub use error_codes::ErrorCode;
pub use messages::{ClientMessage, ProposalEntry, RosterEntry, ServerMessage};
pub use types::{EndReason, PlayerId, PlayerSide, Proposal, RoomStatus, TeamVoteKind};
