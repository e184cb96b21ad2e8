//! Draw conditions that can be read off a single position.

use crate::{Bitboard, Position};
use chess_core::{Color, Piece};

/// Half-move count at which the 75-move rule ends the game.
pub const SEVENTY_FIVE_MOVE_PLIES: u32 = 150;

/// Dead-position material: K v K, K+N v K, K+B v K, or K+B v K+B with both
/// bishops on squares of the same color.
pub fn insufficient_material(position: &Position) -> bool {
    let heavy = [Piece::Pawn, Piece::Rook, Piece::Queen]
        .into_iter()
        .any(|piece| position.pieces[piece.index()].is_not_empty());
    if heavy {
        return false;
    }

    let knights = position.pieces[Piece::Knight.index()];
    let bishops = position.pieces[Piece::Bishop.index()];
    match (knights.count(), bishops.count()) {
        (0, 0) | (1, 0) | (0, 1) => true,
        (0, 2) => {
            let one_each = position.pieces_of(Piece::Bishop, Color::White).count() == 1;
            let dark = (bishops & Bitboard::DARK_SQUARES).count();
            one_each && (dark == 0 || dark == 2)
        }
        _ => false,
    }
}

/// The 75-move rule: 150 half-moves without a pawn move or capture.
pub fn seventy_five_move_rule(position: &Position) -> bool {
    position.halfmove_clock >= SEVENTY_FIVE_MOVE_PLIES
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(fen: &str) -> Position {
        Position::from_fen(fen).unwrap()
    }

    fn insufficient(fen: &str) -> bool {
        insufficient_material(&position(fen))
    }

    #[test]
    fn dead_positions() {
        assert!(insufficient("4k3/8/8/8/8/8/8/4K3 w - - 0 1"));
        assert!(insufficient("4k3/8/8/8/8/8/8/4KN2 w - - 0 1"));
        assert!(insufficient("4kb2/8/8/8/8/8/8/4K3 w - - 0 1"));
        // c1 and f8 are both dark
        assert!(insufficient("5b2/4k3/8/8/8/8/8/2B1K3 w - - 0 1"));
    }

    #[test]
    fn live_positions() {
        assert!(!insufficient(chess_core::STARTPOS));
        assert!(!insufficient("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1"));
        assert!(!insufficient("4k3/8/8/8/8/8/8/3NKN2 w - - 0 1"));
        // c1 dark, c8 light
        assert!(!insufficient("2b1k3/8/8/8/8/8/8/2B1K3 w - - 0 1"));
        // both bishops on one side
        assert!(!insufficient("4k3/8/8/8/8/8/8/2B1KB2 w - - 0 1"));
    }

    #[test]
    fn halfmove_clock_limit() {
        assert!(!seventy_five_move_rule(&position("4k3/8/8/8/8/8/8/R3K3 w - - 149 90")));
        assert!(seventy_five_move_rule(&position("4k3/8/8/8/8/8/8/R3K3 w - - 150 90")));
    }
}
