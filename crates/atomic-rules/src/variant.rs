//! Atomic positions: a base position plus the explosion that reached it.

use chess_core::{Color, FenError, Move, Piece, Square};
use chess_engine::{
    generate_moves, is_king_attacked, make_move_in_place, unmake_move, MakeMoveError, MoveList,
    Position, UndoInfo,
};

use crate::error::MoveError;
use crate::explosion::{explode, ExplosionOutcome};
use crate::legality::{self, IllegalMoveReason};
use crate::terminal::{self, GameStatus};

/// A position under atomic rules.
///
/// Wraps a base [`Position`] and remembers the explosion caused by the move
/// that produced it, which terminal detection needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicPosition {
    board: Position,
    last_explosion: Option<ExplosionOutcome>,
}

/// Token returned by [`AtomicPosition::apply`]; hand it back to
/// [`AtomicPosition::undo`] to revert the move.
#[derive(Debug, Clone)]
#[must_use = "an applied move must be undone or the position stays changed"]
pub struct AppliedMove {
    undo: UndoInfo,
    explosion: Option<ExplosionOutcome>,
    previous_explosion: Option<ExplosionOutcome>,
}

impl AppliedMove {
    pub fn mv(&self) -> Move {
        self.undo.mv
    }

    pub fn explosion(&self) -> Option<&ExplosionOutcome> {
        self.explosion.as_ref()
    }

    /// Squares emptied by the explosion, ascending; empty for quiet moves.
    pub fn exploded_squares(&self) -> Vec<Square> {
        self.explosion
            .as_ref()
            .map(ExplosionOutcome::exploded_squares)
            .unwrap_or_default()
    }
}

impl AtomicPosition {
    /// The standard starting position.
    pub fn new() -> Self {
        Self::from_position(Position::startpos())
    }

    pub fn from_position(board: Position) -> Self {
        AtomicPosition {
            board,
            last_explosion: None,
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        Position::from_fen(fen).map(Self::from_position)
    }

    pub fn to_fen(&self) -> String {
        self.board.to_fen()
    }

    /// The underlying board.
    pub fn position(&self) -> &Position {
        &self.board
    }

    pub fn piece_at(&self, sq: Square) -> Option<(Piece, Color)> {
        self.board.piece_at(sq)
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.board.king_square(color)
    }

    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move
    }

    pub fn piece_count(&self) -> u32 {
        self.board.piece_count()
    }

    pub fn last_explosion(&self) -> Option<&ExplosionOutcome> {
        self.last_explosion.as_ref()
    }

    /// Is the side to move in check? False when its king is gone.
    pub fn is_check(&self) -> bool {
        is_king_attacked(&self.board, self.board.side_to_move)
    }

    pub fn legal_moves(&self) -> MoveList {
        legality::legal_moves(&self.board)
    }

    pub fn check_move(&self, m: Move) -> Result<(), IllegalMoveReason> {
        legality::check_move(&self.board, m)
    }

    pub fn legal_destinations(&self, from: Square) -> std::collections::BTreeSet<Square> {
        legality::legal_destinations(&self.board, from)
    }

    pub fn status(&self) -> GameStatus {
        terminal::detect(&self.board, self.last_explosion.as_ref())
    }

    /// Game over through king loss, decided without generating moves.
    pub fn king_verdict(&self) -> Option<GameStatus> {
        terminal::king_verdict(&self.board, self.last_explosion.as_ref())
    }

    /// Game over by king loss or a draw rule, decided without generating
    /// moves.
    pub fn settled_status(&self) -> Option<GameStatus> {
        terminal::settled_status(&self.board, self.last_explosion.as_ref())
    }

    /// Maps a bare from/to/promotion triple onto the matching generated move,
    /// which carries the castling, en passant or double-push flag.
    ///
    /// Only standard legality is consulted; the atomic filter runs in
    /// [`play`](Self::play).
    pub fn resolve_move(
        &self,
        from: Square,
        to: Square,
        promotion: Option<Piece>,
    ) -> Result<Move, MoveError> {
        generate_moves(&self.board)
            .iter()
            .copied()
            .find(|m| m.from() == from && m.to() == to && m.promotion() == promotion)
            .ok_or_else(|| MoveError::Illegal {
                mv: bare_move(from, to, promotion),
                reason: IllegalMoveReason::NotLegalBaseMove,
            })
    }

    /// Applies a move and its explosion without any legality check.
    ///
    /// On error nothing has changed.
    pub fn apply(&mut self, m: Move) -> Result<AppliedMove, MakeMoveError> {
        let capture = self.board.is_capture(m);
        let undo = make_move_in_place(&mut self.board, m)?;
        let explosion = capture.then(|| explode(&mut self.board, m.to()));
        let previous_explosion = std::mem::replace(&mut self.last_explosion, explosion.clone());
        Ok(AppliedMove {
            undo,
            explosion,
            previous_explosion,
        })
    }

    /// Reverts an [`apply`](Self::apply): the explosion first, then the move.
    /// The result is bit-identical to the position before the move.
    pub fn undo(&mut self, applied: AppliedMove) {
        if let Some(explosion) = &applied.explosion {
            explosion.restore(&mut self.board);
        }
        unmake_move(&mut self.board, applied.undo);
        self.last_explosion = applied.previous_explosion;
    }

    /// Plays a move after running the full legality filter.
    pub fn play(&mut self, m: Move) -> Result<AppliedMove, MoveError> {
        self.check_move(m)
            .map_err(|reason| MoveError::Illegal { mv: m, reason })?;
        Ok(self.apply(m)?)
    }
}

impl Default for AtomicPosition {
    fn default() -> Self {
        Self::new()
    }
}

fn bare_move(from: Square, to: Square, promotion: Option<Piece>) -> Move {
    match promotion.and_then(chess_core::MoveFlag::for_promotion) {
        Some(flag) => Move::new(from, to, flag),
        None => Move::normal(from, to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::MoveFlag;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    #[test]
    fn resolve_adds_flags() {
        let pos = AtomicPosition::new();
        let m = pos.resolve_move(sq("e2"), sq("e4"), None).unwrap();
        assert_eq!(m.flag(), MoveFlag::DoublePush);

        let err = pos.resolve_move(sq("e2"), sq("e5"), None).unwrap_err();
        assert!(matches!(
            err,
            MoveError::Illegal {
                reason: IllegalMoveReason::NotLegalBaseMove,
                ..
            }
        ));
    }

    #[test]
    fn resolve_distinguishes_promotions() {
        let pos = AtomicPosition::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let m = pos.resolve_move(sq("a7"), sq("a8"), Some(Piece::Knight)).unwrap();
        assert_eq!(m.flag(), MoveFlag::PromoteKnight);
        assert!(pos.resolve_move(sq("a7"), sq("a8"), None).is_err());
    }

    #[test]
    fn apply_and_undo_capture() {
        let mut pos =
            AtomicPosition::from_fen("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2")
                .unwrap();
        let before = pos.clone();
        let applied = pos.apply(Move::normal(sq("e4"), sq("d5"))).unwrap();
        // Pawns are immune, so only the captured pawn disappears.
        assert_eq!(applied.exploded_squares(), Vec::<Square>::new());
        assert!(applied.explosion().is_some());
        assert_eq!(pos.piece_count(), 31);
        pos.undo(applied);
        assert_eq!(pos, before);
    }

    #[test]
    fn play_rejects_without_change() {
        let mut pos = AtomicPosition::from_fen("4k3/8/8/8/8/8/4n3/4K3 w - - 0 1").unwrap();
        let before = pos.clone();
        let err = pos.play(Move::normal(sq("e1"), sq("e2"))).unwrap_err();
        assert_eq!(
            err,
            MoveError::Illegal {
                mv: Move::normal(sq("e1"), sq("e2")),
                reason: IllegalMoveReason::SelfExplosion
            }
        );
        assert_eq!(pos, before);
    }

    #[test]
    fn settled_status_covers_draw_rules() {
        let drawn = AtomicPosition::from_fen("4r2k/6p1/8/8/8/8/8/K7 w - - 150 120").unwrap();
        assert!(drawn.king_verdict().is_none());
        assert_eq!(drawn.settled_status(), Some(drawn.status()));
        assert_eq!(AtomicPosition::new().settled_status(), None);
    }
}
