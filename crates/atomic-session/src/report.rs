//! Serializable summaries of committed moves.

use atomic_ai::Strategy;
use atomic_rules::{AtomicPosition, GameStatus, TerminalReason};
use chess_core::{Color, Move, Piece, Square};
use serde::Serialize;

/// A piece on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occupant {
    pub square: Square,
    pub piece: Piece,
    pub color: Color,
}

/// Every occupied square, a1 first.
pub fn occupants(position: &AtomicPosition) -> Vec<Occupant> {
    Square::all()
        .filter_map(|square| {
            position.piece_at(square).map(|(piece, color)| Occupant {
                square,
                piece,
                color,
            })
        })
        .collect()
}

/// The state after a move has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveReport {
    #[serde(rename = "move")]
    pub mv: Move,
    pub fen: String,
    pub board: Vec<Occupant>,
    /// Squares emptied by the explosion, ascending.
    pub exploded: Vec<Square>,
    pub status: GameStatus,
    pub winner: Option<Color>,
    pub reason: Option<TerminalReason>,
    /// `1-0`, `0-1`, `1/2-1/2` or `*`.
    pub result: String,
}

impl MoveReport {
    pub(crate) fn new(
        mv: Move,
        position: &AtomicPosition,
        exploded: Vec<Square>,
        status: GameStatus,
    ) -> Self {
        MoveReport {
            mv,
            fen: position.to_fen(),
            board: occupants(position),
            exploded,
            status,
            winner: status.winner(),
            reason: status.reason(),
            result: status.result_string().to_string(),
        }
    }
}

/// A committed engine move and how it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiMoveReport {
    #[serde(flatten)]
    pub report: MoveReport,
    /// For the side that moved.
    pub score: i32,
    pub nodes: u64,
    pub strategy: Strategy,
}
