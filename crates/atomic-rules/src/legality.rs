//! The atomic legality filter.
//!
//! Standard move generation already rejects moves that leave the mover's
//! king attacked. On top of that a capture is illegal when the mover's king
//! stands in the blast, or when the board left after the blast exposes the
//! mover's king. A capture that destroys the enemy king ends the game on the
//! spot and is allowed even if it exposes the mover's king.

use std::collections::BTreeSet;

use chess_core::{Move, Square};
use chess_engine::{
    generate_moves, is_king_attacked, make_move_in_place, unmake_move, MoveList, Position,
};
use serde::Serialize;
use thiserror::Error;

use crate::explosion::explode;

/// Why the filter rejected a move.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IllegalMoveReason {
    #[error("not a legal move in this position")]
    NotLegalBaseMove,

    #[error("the explosion would destroy your own king")]
    SelfExplosion,

    #[error("your king would be left in check")]
    LeavesKingInCheck,

    #[error("the move could not be simulated")]
    SimulationFailed,
}

impl IllegalMoveReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            IllegalMoveReason::NotLegalBaseMove => "not_legal_base_move",
            IllegalMoveReason::SelfExplosion => "self_explosion",
            IllegalMoveReason::LeavesKingInCheck => "leaves_king_in_check",
            IllegalMoveReason::SimulationFailed => "simulation_failed",
        }
    }
}

/// Checks a move against standard legality and then the atomic rules.
pub fn check_move(position: &Position, m: Move) -> Result<(), IllegalMoveReason> {
    if !generate_moves(position).contains(m) {
        return Err(IllegalMoveReason::NotLegalBaseMove);
    }
    filter(&mut position.clone(), m)
}

/// All moves legal under atomic rules, in generation order.
pub fn legal_moves(position: &Position) -> MoveList {
    let mut moves = generate_moves(position);
    let mut scratch = position.clone();
    moves.retain(|m| filter(&mut scratch, *m).is_ok());
    moves
}

/// Destinations of the legal moves from `from`, ascending. The four
/// promotion choices to one square collapse into a single destination.
pub fn legal_destinations(position: &Position, from: Square) -> BTreeSet<Square> {
    legal_moves(position)
        .iter()
        .filter(|m| m.from() == from)
        .map(|m| m.to())
        .collect()
}

/// Applies the atomic rules to a move that is legal in standard chess.
///
/// `scratch` is used for the trial application and is handed back exactly
/// as it came in, whatever the verdict.
pub(crate) fn filter(scratch: &mut Position, m: Move) -> Result<(), IllegalMoveReason> {
    if !scratch.is_capture(m) {
        return Ok(());
    }

    let us = scratch.side_to_move;
    if let Some(king) = scratch.king_square(us) {
        if king.chebyshev_distance(m.to()) <= 1 {
            return Err(IllegalMoveReason::SelfExplosion);
        }
    }

    let undo =
        make_move_in_place(scratch, m).map_err(|_| IllegalMoveReason::SimulationFailed)?;
    let outcome = explode(scratch, m.to());

    let verdict = if outcome.destroyed_king == Some(us.opposite()) {
        Ok(())
    } else if is_king_attacked(scratch, us) {
        Err(IllegalMoveReason::LeavesKingInCheck)
    } else {
        Ok(())
    };

    outcome.restore(scratch);
    unmake_move(scratch, undo);
    verdict
}
