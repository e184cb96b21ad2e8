//! Game-over detection.
//!
//! King loss is decided first, from the board alone, so that nothing
//! downstream ever asks a king-dependent question about a kingless board.
//! Mate and stalemate are then judged on the atomic-legal move list.

use std::fmt;

use chess_core::Color;
use chess_engine::{insufficient_material, is_king_attacked, seventy_five_move_rule, Position};
use serde::Serialize;

use crate::explosion::ExplosionOutcome;
use crate::legality::legal_moves;

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    KingDestroyed,
    KingMissing,
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    SeventyFiveMoveRule,
    FivefoldRepetition,
}

impl TerminalReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            TerminalReason::KingDestroyed => "king_destroyed",
            TerminalReason::KingMissing => "king_missing",
            TerminalReason::Checkmate => "checkmate",
            TerminalReason::Stalemate => "stalemate",
            TerminalReason::InsufficientMaterial => "insufficient_material",
            TerminalReason::SeventyFiveMoveRule => "seventy_five_move_rule",
            TerminalReason::FivefoldRepetition => "fivefold_repetition",
        }
    }
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the game goes on, and if not, how it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GameStatus {
    Ongoing,
    Over {
        winner: Option<Color>,
        reason: TerminalReason,
    },
}

impl GameStatus {
    pub const fn win(winner: Color, reason: TerminalReason) -> Self {
        GameStatus::Over {
            winner: Some(winner),
            reason,
        }
    }

    pub const fn draw(reason: TerminalReason) -> Self {
        GameStatus::Over {
            winner: None,
            reason,
        }
    }

    pub const fn is_over(self) -> bool {
        matches!(self, GameStatus::Over { .. })
    }

    pub const fn winner(self) -> Option<Color> {
        match self {
            GameStatus::Over { winner, .. } => winner,
            GameStatus::Ongoing => None,
        }
    }

    pub const fn reason(self) -> Option<TerminalReason> {
        match self {
            GameStatus::Over { reason, .. } => Some(reason),
            GameStatus::Ongoing => None,
        }
    }

    /// PGN-style result: `1-0`, `0-1`, `1/2-1/2`, or `*` while ongoing.
    pub const fn result_string(self) -> &'static str {
        match self {
            GameStatus::Ongoing => "*",
            GameStatus::Over {
                winner: Some(Color::White),
                ..
            } => "1-0",
            GameStatus::Over {
                winner: Some(Color::Black),
                ..
            } => "0-1",
            GameStatus::Over { winner: None, .. } => "1/2-1/2",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Ongoing => f.write_str("ongoing"),
            GameStatus::Over {
                winner: Some(color),
                reason,
            } => write!(f, "{} wins by {}", color, reason),
            GameStatus::Over {
                winner: None,
                reason,
            } => write!(f, "draw by {}", reason),
        }
    }
}

/// The first two steps of [`detect`]: a king destroyed by the last
/// explosion, or a king missing from the board. Cheap, since no moves are
/// generated.
pub fn king_verdict(
    position: &Position,
    last_explosion: Option<&ExplosionOutcome>,
) -> Option<GameStatus> {
    if let Some(loser) = last_explosion.and_then(|e| e.destroyed_king) {
        return Some(GameStatus::win(loser.opposite(), TerminalReason::KingDestroyed));
    }

    let white = position.king_square(Color::White).is_some();
    let black = position.king_square(Color::Black).is_some();
    match (white, black) {
        (true, true) => None,
        (true, false) => Some(GameStatus::win(Color::White, TerminalReason::KingMissing)),
        (false, true) => Some(GameStatus::win(Color::Black, TerminalReason::KingMissing)),
        (false, false) => Some(GameStatus::win(
            position.side_to_move,
            TerminalReason::KingMissing,
        )),
    }
}

/// Every verdict that needs no move generation: [`king_verdict`], then
/// insufficient material, then the 75-move rule.
///
/// Mate and stalemate are not seen here. A search that has already found
/// the move list empty decides those itself.
pub fn settled_status(
    position: &Position,
    last_explosion: Option<&ExplosionOutcome>,
) -> Option<GameStatus> {
    if let Some(status) = king_verdict(position, last_explosion) {
        return Some(status);
    }
    if insufficient_material(position) {
        return Some(GameStatus::draw(TerminalReason::InsufficientMaterial));
    }
    if seventy_five_move_rule(position) {
        return Some(GameStatus::draw(TerminalReason::SeventyFiveMoveRule));
    }
    None
}

/// Decides the status of `position`, given the explosion produced by the
/// move that reached it.
///
/// Precedence: king destroyed by that explosion, any king missing from the
/// board, checkmate, stalemate, insufficient material, the 75-move rule.
/// With both kings gone the side to move is named winner, matching the rule
/// that a blast taking both kings counts against the side that set it off.
pub fn detect(position: &Position, last_explosion: Option<&ExplosionOutcome>) -> GameStatus {
    if let Some(status) = king_verdict(position, last_explosion) {
        return status;
    }

    let us = position.side_to_move;
    if legal_moves(position).is_empty() {
        return if is_king_attacked(position, us) {
            GameStatus::win(us.opposite(), TerminalReason::Checkmate)
        } else {
            GameStatus::draw(TerminalReason::Stalemate)
        };
    }

    if insufficient_material(position) {
        return GameStatus::draw(TerminalReason::InsufficientMaterial);
    }
    if seventy_five_move_rule(position) {
        return GameStatus::draw(TerminalReason::SeventyFiveMoveRule);
    }

    GameStatus::Ongoing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explosion::explode;
    use chess_core::Square;

    fn status(fen: &str) -> GameStatus {
        detect(&Position::from_fen(fen).unwrap(), None)
    }

    #[test]
    fn ongoing_at_start() {
        assert_eq!(detect(&Position::startpos(), None), GameStatus::Ongoing);
        assert_eq!(GameStatus::Ongoing.result_string(), "*");
    }

    #[test]
    fn destroyed_king_comes_first() {
        let mut pos = Position::from_fen("8/8/8/3k4/3Q4/8/8/4K3 b - - 0 1").unwrap();
        let outcome = explode(&mut pos, Square::from_algebraic("d4").unwrap());
        let status = detect(&pos, Some(&outcome));
        assert_eq!(status, GameStatus::win(Color::White, TerminalReason::KingDestroyed));
        assert_eq!(status.result_string(), "1-0");
    }

    #[test]
    fn missing_king_without_explosion() {
        assert_eq!(
            status("8/8/8/8/8/8/8/4K3 b - - 0 1"),
            GameStatus::win(Color::White, TerminalReason::KingMissing)
        );
        assert_eq!(
            status("4k3/8/8/8/8/8/8/8 w - - 0 1"),
            GameStatus::win(Color::Black, TerminalReason::KingMissing)
        );
        assert_eq!(
            status("8/8/8/8/8/8/8/8 b - - 0 1").winner(),
            Some(Color::Black)
        );
    }

    #[test]
    fn checkmate_and_stalemate() {
        let mate = status("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
        assert_eq!(mate, GameStatus::win(Color::Black, TerminalReason::Checkmate));
        assert_eq!(mate.result_string(), "0-1");

        let stale = status("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        assert_eq!(stale, GameStatus::draw(TerminalReason::Stalemate));
        assert_eq!(stale.result_string(), "1/2-1/2");
    }

    #[test]
    fn atomic_only_stalemate() {
        // Black's only standard move is Kxb7, and a king may never capture.
        let stale = status("k7/1R6/8/2K5/8/8/8/8 b - - 0 1");
        assert_eq!(stale, GameStatus::draw(TerminalReason::Stalemate));
    }

    #[test]
    fn draws() {
        assert_eq!(
            status("4k3/8/8/8/8/8/8/4KB2 w - - 0 1"),
            GameStatus::draw(TerminalReason::InsufficientMaterial)
        );
        assert_eq!(
            status("4k3/8/8/8/8/8/8/R3K3 b - - 150 80"),
            GameStatus::draw(TerminalReason::SeventyFiveMoveRule)
        );
    }

    #[test]
    fn status_serializes_with_snake_case() {
        let json = serde_json::to_string(&GameStatus::win(
            Color::White,
            TerminalReason::KingDestroyed,
        ))
        .unwrap();
        assert_eq!(
            json,
            r#"{"state":"over","winner":"white","reason":"king_destroyed"}"#
        );
        assert_eq!(
            serde_json::to_string(&GameStatus::Ongoing).unwrap(),
            r#"{"state":"ongoing"}"#
        );
    }

    #[test]
    fn settled_without_move_generation() {
        let settled = |fen: &str| settled_status(&Position::from_fen(fen).unwrap(), None);
        assert_eq!(settled(chess_core::STARTPOS), None);
        assert_eq!(
            settled("8/8/8/8/8/8/8/4K3 b - - 0 1"),
            Some(GameStatus::win(Color::White, TerminalReason::KingMissing))
        );
        assert_eq!(
            settled("4k3/8/8/8/8/8/8/4KN2 w - - 0 1"),
            Some(GameStatus::draw(TerminalReason::InsufficientMaterial))
        );
        assert_eq!(
            settled("4r2k/6p1/8/8/8/8/8/K7 b - - 150 120"),
            Some(GameStatus::draw(TerminalReason::SeventyFiveMoveRule))
        );
        // Checkmate is left to the caller.
        assert_eq!(
            settled("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3"),
            None
        );
    }

    #[test]
    fn settled_agrees_with_detect_on_draws() {
        for fen in [
            "4k3/8/8/8/8/8/8/4KB2 w - - 0 1",
            "4k3/8/8/8/8/8/8/R3K3 b - - 150 80",
        ] {
            let position = Position::from_fen(fen).unwrap();
            assert_eq!(settled_status(&position, None), Some(detect(&position, None)));
        }
    }
}
