//! Negamax search with alpha-beta pruning.

use std::cmp::Reverse;
use std::time::Instant;

use atomic_rules::AtomicPosition;
use chess_core::{Move, MoveFlag, Piece};
use chess_engine::Position;

use crate::error::SearchError;
use crate::eval::{piece_value, Evaluator, DECIDED_SCORE, WIN_SCORE};

const INFINITY: i32 = WIN_SCORE + 1;

/// Result of an alpha-beta search, scored for the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlphaBetaResult {
    /// `None` at depth 0 or when there is no legal move.
    pub best_move: Option<Move>,
    pub score: i32,
    pub nodes: u64,
}

/// Search state
pub struct AlphaBeta<'a> {
    evaluator: &'a dyn Evaluator,
    nodes: u64,
}

impl<'a> AlphaBeta<'a> {
    pub fn new(evaluator: &'a dyn Evaluator) -> Self {
        AlphaBeta {
            evaluator,
            nodes: 0,
        }
    }

    /// Searches `depth` plies from `root`.
    ///
    /// Works on a private copy; `root` is never touched. A branch that fails
    /// is skipped, and if all of them fail the first legal move is returned
    /// with a neutral score.
    pub fn search(&mut self, root: &AtomicPosition, depth: u8) -> AlphaBetaResult {
        self.nodes = 0;
        let start = Instant::now();
        let us = root.side_to_move();

        if depth == 0 {
            let score = match self.evaluator.evaluate(root, us) {
                Ok(score) => score,
                Err(e) => {
                    tracing::warn!("evaluation failed at depth 0: {}", e);
                    0
                }
            };
            return AlphaBetaResult {
                best_move: None,
                score,
                nodes: 0,
            };
        }

        let legal = root.legal_moves();
        let Some(&first) = legal.iter().next() else {
            return AlphaBetaResult {
                best_move: None,
                score: -WIN_SCORE,
                nodes: 0,
            };
        };

        let mut position = root.clone();
        let mut alpha = -INFINITY;
        let mut best: Option<(Move, i32)> = None;

        for m in ordered_moves(&position) {
            match self.child_score(&mut position, m, depth - 1, alpha, INFINITY) {
                Ok(score) => {
                    if best.map_or(true, |(_, best_score)| score > best_score) {
                        best = Some((m, score));
                    }
                    alpha = alpha.max(score);
                }
                Err(e) => tracing::debug!("branch {} abandoned: {}", m, e),
            }
        }

        let (best_move, score) = best.unwrap_or_else(|| {
            tracing::warn!("every branch failed, falling back to {}", first);
            (first, 0)
        });

        tracing::debug!(
            "alpha-beta depth {}: {} score {} nodes {} in {:?}",
            depth,
            best_move,
            score,
            self.nodes,
            start.elapsed()
        );

        AlphaBetaResult {
            best_move: Some(best_move),
            score,
            nodes: self.nodes,
        }
    }

    fn negamax(
        &mut self,
        position: &mut AtomicPosition,
        depth: u8,
        mut alpha: i32,
        beta: i32,
    ) -> Result<i32, SearchError> {
        self.nodes += 1;

        // King loss before the draw rules: a kingless board has no
        // meaningful move list.
        if depth == 0 || position.settled_status().is_some() {
            return Ok(self
                .evaluator
                .evaluate(position, position.side_to_move())?);
        }

        let moves = ordered_moves(position);
        if moves.is_empty() {
            return Ok(-WIN_SCORE);
        }

        let mut best = -INFINITY;
        let mut searched = false;
        for m in moves {
            let score = match self.child_score(position, m, depth - 1, alpha, beta) {
                Ok(score) => score,
                Err(e) => {
                    tracing::trace!("branch {} abandoned: {}", m, e);
                    continue;
                }
            };
            searched = true;
            best = best.max(score);
            alpha = alpha.max(score);
            if alpha >= beta {
                break;
            }
        }

        if !searched {
            return Err(SearchError::AllBranchesFailed);
        }
        Ok(best)
    }

    /// Score of `m` for the side making it, searched within the mover's
    /// `(alpha, beta)` window. Always restores `position`.
    fn child_score(
        &mut self,
        position: &mut AtomicPosition,
        m: Move,
        depth: u8,
        alpha: i32,
        beta: i32,
    ) -> Result<i32, SearchError> {
        let applied = position.apply(m)?;
        let result = self.negamax(
            position,
            depth,
            -away_from_zero(beta),
            -away_from_zero(alpha),
        );
        position.undo(applied);
        result.map(|score| toward_zero(-score))
    }
}

/// Decided scores lose a point per ply so that quicker wins rank higher.
fn toward_zero(score: i32) -> i32 {
    if score >= DECIDED_SCORE {
        score - 1
    } else if score <= -DECIDED_SCORE {
        score + 1
    } else {
        score
    }
}

/// Inverse of [`toward_zero`] on window bounds. A decided bound moves one
/// point outward so the child sees the score before the ply adjustment.
fn away_from_zero(bound: i32) -> i32 {
    if bound >= DECIDED_SCORE - 1 {
        (bound + 1).min(INFINITY)
    } else if bound <= -(DECIDED_SCORE - 1) {
        (bound - 1).max(-INFINITY)
    } else {
        bound
    }
}

/// Legal moves, most valuable victim first. The sort is stable, so quiet
/// moves keep generation order.
fn ordered_moves(position: &AtomicPosition) -> Vec<Move> {
    let mut moves: Vec<Move> = position.legal_moves().iter().copied().collect();
    moves.sort_by_key(|&m| Reverse(victim_value(position.position(), m)));
    moves
}

fn victim_value(position: &Position, m: Move) -> i32 {
    if m.flag() == MoveFlag::EnPassant {
        return piece_value(Piece::Pawn);
    }
    position
        .piece_at(m.to())
        .map_or(0, |(piece, _)| piece_value(piece))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{EvalError, HeuristicEvaluator};
    use atomic_rules::{GameStatus, TerminalReason};
    use chess_core::{Color, Square};
    use proptest::prelude::*;

    struct Fixed(i32);

    impl Evaluator for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn evaluate(&self, _: &AtomicPosition, _: Color) -> Result<i32, EvalError> {
            Ok(self.0)
        }
    }

    /// Fails whenever `square` is occupied, scores zero otherwise.
    struct FailsOn(Square);

    impl Evaluator for FailsOn {
        fn name(&self) -> &str {
            "fails-on"
        }

        fn evaluate(&self, position: &AtomicPosition, _: Color) -> Result<i32, EvalError> {
            match position.piece_at(self.0) {
                Some(_) => Err(EvalError::NonFinite),
                None => Ok(0),
            }
        }
    }

    fn search(fen: &str, depth: u8) -> AlphaBetaResult {
        let position = AtomicPosition::from_fen(fen).unwrap();
        let evaluator = HeuristicEvaluator::default();
        AlphaBeta::new(&evaluator).search(&position, depth)
    }

    #[test]
    fn depth_zero_is_static_eval() {
        let fen = "7k/8/8/3q4/8/8/P7/K2R4 w - - 0 1";
        let position = AtomicPosition::from_fen(fen).unwrap();
        let evaluator = HeuristicEvaluator::default();
        let expected = evaluator.evaluate(&position, Color::White).unwrap();

        let result = AlphaBeta::new(&evaluator).search(&position, 0);
        assert_eq!(result.best_move, None);
        assert_eq!(result.score, expected);
        assert_eq!(result.nodes, 0);
    }

    #[test]
    fn blows_up_the_enemy_king() {
        // Qxd2 takes the knight and the king on c3 with it.
        for depth in 1..=3 {
            let result = search("8/8/8/8/8/2k5/3n4/3Q2K1 w - - 0 1", depth);
            assert_eq!(result.best_move.unwrap().to_uci(), "d1d2", "depth {}", depth);
            assert!(result.score >= DECIDED_SCORE);
        }
    }

    #[test]
    fn trades_rook_for_queen() {
        // Rxd5 loses the rook in the blast but takes the queen.
        for depth in 1..=2 {
            let result = search("7k/8/8/3q4/8/8/P7/K2R4 w - - 0 1", depth);
            assert_eq!(result.best_move.unwrap().to_uci(), "d1d5", "depth {}", depth);
            assert!(result.nodes > 0);
        }
    }

    #[test]
    fn no_moves_is_forced_loss() {
        let result = search("k7/1R6/8/2K5/8/8/8/8 b - - 0 1", 2);
        assert_eq!(result.best_move, None);
        assert_eq!(result.score, -WIN_SCORE);
    }

    #[test]
    fn ties_go_to_first_move() {
        let position = AtomicPosition::new();
        let evaluator = Fixed(0);
        let result = AlphaBeta::new(&evaluator).search(&position, 1);
        assert_eq!(result.best_move, position.legal_moves().iter().next().copied());
        assert_eq!(result.score, 0);
        assert_eq!(result.nodes, 20);
    }

    #[test]
    fn failing_branches_are_skipped() {
        let position = AtomicPosition::new();
        let e4 = Square::from_algebraic("e4").unwrap();
        let evaluator = FailsOn(e4);
        let result = AlphaBeta::new(&evaluator).search(&position, 1);
        assert_ne!(result.best_move.unwrap().to(), e4);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn all_branches_failing_falls_back_to_first_move() {
        let position = AtomicPosition::new();
        // The white king stays on e1 for two plies, so every leaf fails.
        let evaluator = FailsOn(Square::E1);
        let result = AlphaBeta::new(&evaluator).search(&position, 2);
        assert_eq!(result.best_move, position.legal_moves().iter().next().copied());
        assert_eq!(result.score, 0);
    }

    #[test]
    fn root_is_untouched() {
        let position = AtomicPosition::from_fen("8/8/8/8/8/2k5/3n4/3Q2K1 w - - 0 1").unwrap();
        let before = position.clone();
        let evaluator = HeuristicEvaluator::default();
        let _ = AlphaBeta::new(&evaluator).search(&position, 3);
        assert_eq!(position, before);
    }

    #[test]
    fn captures_are_tried_first() {
        let position = AtomicPosition::from_fen("7k/8/8/3q4/8/8/P7/K2R4 w - - 0 1").unwrap();
        let moves = ordered_moves(&position);
        assert_eq!(moves[0].to_uci(), "d1d5");
        assert_eq!(moves.len(), position.legal_moves().len());
    }

    /// Full-width negamax with the same leaves and ply adjustment.
    fn minimax(evaluator: &dyn Evaluator, position: &mut AtomicPosition, depth: u8) -> i32 {
        if depth == 0 || position.settled_status().is_some() {
            return evaluator.evaluate(position, position.side_to_move()).unwrap();
        }
        let moves = position.legal_moves();
        if moves.is_empty() {
            return -WIN_SCORE;
        }
        let mut best = -INFINITY;
        for &m in moves.iter() {
            let applied = position.apply(m).unwrap();
            let score = toward_zero(-minimax(evaluator, position, depth - 1));
            position.undo(applied);
            best = best.max(score);
        }
        best
    }

    #[test]
    fn draw_rules_end_the_search() {
        // Every white king move reaches the 150th quiet half-move.
        let fen = "4r2k/6p1/8/8/8/8/8/K7 w - - 149 120";
        let mut position = AtomicPosition::from_fen(fen).unwrap();
        let moves = position.legal_moves();
        for &m in moves.iter() {
            let applied = position.apply(m).unwrap();
            assert_eq!(
                position.status(),
                GameStatus::draw(TerminalReason::SeventyFiveMoveRule)
            );
            position.undo(applied);
        }

        for depth in 1..=3 {
            let result = search(fen, depth);
            assert_eq!(result.score, 0, "depth {}", depth);
            assert!(result.best_move.is_some());
        }
    }

    #[test]
    fn dead_material_is_a_leaf() {
        // Bxa8 leaves bare kings; the search must not play on past it.
        let result = search("r6k/8/8/8/8/8/6B1/K7 w - - 0 1", 2);
        let best = result.best_move.unwrap();
        assert_eq!(best.to_uci(), "g2a8");
        assert_eq!(result.score, 0);
    }

    #[test]
    fn pruning_keeps_exact_decided_scores() {
        let evaluator = HeuristicEvaluator::default();
        for fen in [
            "8/8/8/8/8/2k5/3n4/3Q2K1 w - - 0 1",
            "8/8/8/8/8/2k5/3n4/3Q2K1 b - - 0 1",
            "k7/8/1K6/8/8/8/8/7R w - - 0 1",
        ] {
            let mut position = AtomicPosition::from_fen(fen).unwrap();
            for depth in 1..=3 {
                let expected = minimax(&evaluator, &mut position, depth);
                let result = AlphaBeta::new(&evaluator).search(&position, depth);
                assert_eq!(result.score, expected, "{} depth {}", fen, depth);
            }
        }
    }

    #[test]
    fn window_bounds_invert_the_ply_adjustment() {
        for bound in [0, 500, DECIDED_SCORE - 2, DECIDED_SCORE - 1, DECIDED_SCORE, WIN_SCORE] {
            assert_eq!(toward_zero(away_from_zero(bound)), bound);
            assert_eq!(toward_zero(away_from_zero(-bound)), -bound);
        }
        assert_eq!(away_from_zero(INFINITY), INFINITY);
        assert_eq!(away_from_zero(-INFINITY), -INFINITY);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn widened_bounds_never_cut_too_early(
            score in -WIN_SCORE..=WIN_SCORE,
            bound in -WIN_SCORE..=WIN_SCORE,
        ) {
            // A child score outside the widened bound maps outside the
            // original one once adjusted.
            if score <= away_from_zero(bound) {
                prop_assert!(toward_zero(score) <= bound);
            }
            if score >= away_from_zero(bound) {
                prop_assert!(toward_zero(score) >= bound);
            }
        }

        #[test]
        fn best_move_is_legal(choices in prop::collection::vec(any::<prop::sample::Index>(), 0..12)) {
            let mut position = AtomicPosition::new();
            for choice in choices {
                if position.status().is_over() {
                    break;
                }
                let moves = position.legal_moves();
                let m = moves.as_slice()[choice.index(moves.len())];
                let _ = position.apply(m).unwrap();
            }
            prop_assume!(!position.status().is_over());

            let evaluator = HeuristicEvaluator::default();
            let result = AlphaBeta::new(&evaluator).search(&position, 2);
            let best = result.best_move.unwrap();
            prop_assert!(position.legal_moves().contains(best));
        }
    }
}
