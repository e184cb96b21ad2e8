//! The explosion that follows every capture.
//!
//! A capture on square `c` removes every non-pawn piece in the 3x3 block
//! centred on `c`, clipped to the board. The capturing piece stands on `c`
//! and is removed with the rest unless it is a pawn. There is exactly one
//! blast per capture: pieces removed by it do not detonate in turn.

use chess_core::{Color, Piece, Square};
use chess_engine::{Bitboard, CastlingRights, Position};
use serde::Serialize;

/// A piece taken off the board by an explosion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemovedPiece {
    pub square: Square,
    pub piece: Piece,
    pub color: Color,
}

/// What one explosion did to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplosionOutcome {
    /// The capture square the blast is centred on.
    pub center: Square,
    /// Every removed piece, in ascending square order. Never holds a pawn.
    pub removed: Vec<RemovedPiece>,
    /// The king caught in the blast, if any.
    pub destroyed_king: Option<Color>,
    castling_before: CastlingRights,
}

impl ExplosionOutcome {
    /// Squares emptied by the blast, ascending.
    pub fn exploded_squares(&self) -> Vec<Square> {
        self.removed.iter().map(|r| r.square).collect()
    }

    /// Puts every removed piece back and reinstates the castling rights the
    /// blast revoked.
    pub fn restore(&self, position: &mut Position) {
        for r in &self.removed {
            position.put_piece(r.square, r.piece, r.color);
        }
        position.castling = self.castling_before;
    }
}

/// The squares a capture on `center` affects, center included.
pub fn blast_zone(center: Square) -> Bitboard {
    Bitboard::from_square(center).dilate()
}

/// Detonates a capture on `center`.
///
/// Call right after the capturing move has been applied; the side that just
/// moved is taken to be the detonating side. Castling rights tied to an
/// exploded king or rook are revoked. If both kings are caught, which the
/// legality filter never allows, the detonating side's king is reported.
pub fn explode(position: &mut Position, center: Square) -> ExplosionOutcome {
    let detonator = position.side_to_move.opposite();
    let castling_before = position.castling;

    let mut removed = Vec::with_capacity(9);
    let mut destroyed_king = None;

    for square in blast_zone(center) {
        match position.piece_at(square) {
            Some((Piece::Pawn, _)) | None => {}
            Some((piece, color)) => {
                position.remove_piece(square);
                position.castling.revoke_for_square(square);
                if piece == Piece::King && destroyed_king != Some(detonator) {
                    destroyed_king = Some(color);
                }
                removed.push(RemovedPiece {
                    square,
                    piece,
                    color,
                });
            }
        }
    }

    ExplosionOutcome {
        center,
        removed,
        destroyed_king,
        castling_before,
    }
}
