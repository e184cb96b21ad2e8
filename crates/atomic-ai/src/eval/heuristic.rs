//! Material, explosion exposure and mobility.

use atomic_rules::AtomicPosition;
use chess_core::{Color, Piece};
use chess_engine::{king_attacks, Position};
use serde::{Deserialize, Serialize};

use super::{terminal_score, EvalError, Evaluator};

/// Default piece value in centipawns; kings are not counted.
pub const fn piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 100,
        Piece::Knight => 320,
        Piece::Bishop => 330,
        Piece::Rook => 500,
        Piece::Queen => 900,
        Piece::King => 0,
    }
}

/// Tunable terms of [`HeuristicEvaluator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicWeights {
    pub pawn: i32,
    pub knight: i32,
    pub bishop: i32,
    pub rook: i32,
    pub queen: i32,
    /// Penalty per enemy piece next to the king.
    pub king_adjacent: i32,
    /// Penalty per enemy piece two squares from the king.
    pub king_near: i32,
    /// Bonus per empty square next to a friendly non-king piece.
    pub mobility: i32,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        HeuristicWeights {
            pawn: piece_value(Piece::Pawn),
            knight: piece_value(Piece::Knight),
            bishop: piece_value(Piece::Bishop),
            rook: piece_value(Piece::Rook),
            queen: piece_value(Piece::Queen),
            king_adjacent: 150,
            king_near: 60,
            mobility: 2,
        }
    }
}

impl HeuristicWeights {
    fn value(&self, piece: Piece) -> i32 {
        match piece {
            Piece::Pawn => self.pawn,
            Piece::Knight => self.knight,
            Piece::Bishop => self.bishop,
            Piece::Rook => self.rook,
            Piece::Queen => self.queen,
            Piece::King => 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeuristicEvaluator {
    weights: HeuristicWeights,
}

impl HeuristicEvaluator {
    pub fn new(weights: HeuristicWeights) -> Self {
        HeuristicEvaluator { weights }
    }

    pub fn weights(&self) -> &HeuristicWeights {
        &self.weights
    }

    /// White-relative score of a position that is not terminal.
    fn score_white(&self, position: &Position) -> i32 {
        Color::ALL
            .iter()
            .map(|&color| color.sign() * self.score_side(position, color))
            .sum()
    }

    fn score_side(&self, position: &Position, color: Color) -> i32 {
        let w = &self.weights;
        let empty = position.empty_squares();
        let mut score = 0;

        for piece in Piece::ALL {
            for sq in position.pieces_of(piece, color) {
                score += w.value(piece);
                if piece != Piece::King {
                    score += w.mobility * (king_attacks(sq) & empty).count() as i32;
                }
            }
        }

        if let Some(king) = position.king_square(color) {
            let enemies = position.color_pieces(color.opposite())
                & !position.pieces_of(Piece::King, color.opposite());
            for sq in enemies {
                match king.chebyshev_distance(sq) {
                    1 => score -= w.king_adjacent,
                    2 => score -= w.king_near,
                    _ => {}
                }
            }
        }

        score
    }
}

impl Evaluator for HeuristicEvaluator {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn evaluate(&self, position: &AtomicPosition, perspective: Color) -> Result<i32, EvalError> {
        if let Some(score) = terminal_score(position.status(), perspective) {
            return Ok(score);
        }
        Ok(perspective.sign() * self.score_white(position.position()))
    }
}
