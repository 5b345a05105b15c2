//! Thin wrapper around the external chess rules library (spec §1: move legality,
//! game-over detection, SAN/LAN conversion, and PGN export are out of core scope
//! and delegated entirely to `shakmaty`).

use std::fmt;

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{Chess, Color, EnPassantMode, Move, Outcome, Position};

use crate::protocol::{EndReason, PlayerSide};

#[derive(Debug, thiserror::Error)]
pub enum ChessError {
    #[error("move string is not valid long algebraic notation")]
    IllegalFormat,
    #[error("move is not legal in the current position")]
    IllegalMove,
}

fn color_to_side(color: Color) -> PlayerSide {
    match color {
        Color::White => PlayerSide::White,
        Color::Black => PlayerSide::Black,
    }
}

/// The board plus enough move history to detect threefold repetition and
/// render a PGN at game-over.
#[derive(Clone)]
pub struct Board {
    position: Chess,
    /// Reduced-FEN (board + side + castling + en passant) seen so far, for
    /// threefold-repetition detection.
    repetitions: std::collections::HashMap<String, u32>,
    /// SAN of every move played, in order, for PGN rendering.
    san_history: Vec<String>,
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board").field("fen", &self.fen()).finish()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        let position = Chess::default();
        let mut board = Self {
            position,
            repetitions: std::collections::HashMap::new(),
            san_history: Vec::new(),
        };
        board.record_repetition();
        board
    }

    pub fn side_to_move(&self) -> PlayerSide {
        color_to_side(self.position.turn())
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.position, EnPassantMode::Legal).to_string()
    }

    fn reduced_fen_key(&self) -> String {
        // First four space-separated FEN fields identify the repeated
        // position: board, side to move, castling rights, en passant square.
        self.fen()
            .split(' ')
            .take(4)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn record_repetition(&mut self) {
        let key = self.reduced_fen_key();
        *self.repetitions.entry(key).or_insert(0) += 1;
    }

    /// Parse and validate `lan` against a copy of the current position,
    /// without mutating `self` (spec §4.1: "do not mutate the board").
    pub fn validate_lan(&self, lan: &str) -> Result<(Move, String), ChessError> {
        let uci: UciMove = lan.parse().map_err(|_| ChessError::IllegalFormat)?;
        let mv = uci
            .to_move(&self.position)
            .map_err(|_| ChessError::IllegalMove)?;
        let san = SanPlus::from_move(self.position.clone(), &mv).to_string();
        Ok((mv, san))
    }

    /// Apply an already-validated move to the real board.
    pub fn apply(&mut self, mv: &Move) -> Result<(), ChessError> {
        let san = SanPlus::from_move(self.position.clone(), mv).to_string();
        self.position = self
            .position
            .clone()
            .play(mv)
            .map_err(|_| ChessError::IllegalMove)?;
        self.san_history.push(san);
        self.record_repetition();
        Ok(())
    }

    fn is_threefold_repetition(&self) -> bool {
        self.repetitions
            .get(&self.reduced_fen_key())
            .is_some_and(|&count| count >= 3)
    }

    fn is_fifty_move_rule(&self) -> bool {
        self.position.halfmoves() >= 100
    }

    /// Terminal condition detection following `chess.isGameOver()` (spec §4.1 step 7).
    /// Returns `None` while the game continues.
    pub fn game_over_reason(&self) -> Option<(EndReason, Option<PlayerSide>)> {
        if self.is_threefold_repetition() {
            return Some((EndReason::ThreefoldRepetition, None));
        }
        if self.is_fifty_move_rule() {
            return Some((EndReason::FiftyMoveRule, None));
        }
        match self.position.outcome() {
            Some(Outcome::Decisive { winner }) => {
                Some((EndReason::Checkmate, Some(color_to_side(winner))))
            }
            Some(Outcome::Draw) => {
                if self.position.is_stalemate() {
                    Some((EndReason::Stalemate, None))
                } else {
                    Some((EndReason::InsufficientMaterial, None))
                }
            }
            None => None,
        }
    }

    /// Render a minimal PGN with a single numeric movetext line and a result tag,
    /// matching what `shakmaty` itself does not provide out of the box.
    pub fn to_pgn(&self, reason: EndReason, winner: Option<PlayerSide>) -> String {
        let result = match (reason.is_draw(), winner) {
            (true, _) => "1/2-1/2",
            (false, Some(PlayerSide::White)) => "1-0",
            (false, Some(PlayerSide::Black)) => "0-1",
            (false, _) => "*",
        };

        let mut movetext = String::new();
        for (idx, san) in self.san_history.iter().enumerate() {
            if idx % 2 == 0 {
                movetext.push_str(&format!("{}. ", idx / 2 + 1));
            }
            movetext.push_str(san);
            movetext.push(' ');
        }
        movetext.push_str(result);

        format!("[Result \"{result}\"]\n\n{movetext}")
    }

    #[cfg(test)]
    pub fn san_history(&self) -> &[String] {
        &self.san_history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_allows_e4() {
        let board = Board::new();
        let (_, san) = board.validate_lan("e2e4").unwrap();
        assert_eq!(san, "e4");
    }

    #[test]
    fn rejects_illegal_lan() {
        let board = Board::new();
        assert!(matches!(
            board.validate_lan("e2e5"),
            Err(ChessError::IllegalMove)
        ));
    }

    #[test]
    fn rejects_malformed_lan() {
        let board = Board::new();
        assert!(matches!(
            board.validate_lan("not-a-move"),
            Err(ChessError::IllegalFormat)
        ));
    }

    #[test]
    fn fools_mate_ends_in_checkmate() {
        let mut board = Board::new();
        for lan in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            let (mv, _) = board.validate_lan(lan).unwrap();
            board.apply(&mv).unwrap();
        }
        let (reason, winner) = board.game_over_reason().unwrap();
        assert_eq!(reason, EndReason::Checkmate);
        assert_eq!(winner, Some(PlayerSide::Black));
    }
}
