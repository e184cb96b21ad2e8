//! Position evaluation.
//!
//! Every evaluator scores a position in centipawns from a requested
//! perspective: positive is good for `perspective`, whoever is to move.

mod heuristic;
mod learned;

pub use heuristic::{piece_value, HeuristicEvaluator, HeuristicWeights};
pub use learned::{ConvScorer, ConvWeights};

use atomic_rules::{AtomicPosition, GameStatus};
use chess_core::Color;
use thiserror::Error;

/// Score of a won position.
pub const WIN_SCORE: i32 = 100_000;

/// Score of a drawn position.
pub const DRAW_SCORE: i32 = 0;

/// Scores at or beyond this magnitude are decided games.
pub(crate) const DECIDED_SCORE: i32 = WIN_SCORE - 1_000;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("failed to read weights: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse weights: {0}")]
    Json(#[from] serde_json::Error),
    #[error("weight shape mismatch: {0}")]
    Shape(String),
    #[error("evaluation produced a non-finite value")]
    NonFinite,
}

/// Scores positions for search.
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &str;

    /// Centipawn score of `position` for `perspective`.
    fn evaluate(&self, position: &AtomicPosition, perspective: Color) -> Result<i32, EvalError>;
}

/// The sentinel for a finished game, or `None` while it is still going.
pub fn terminal_score(status: GameStatus, perspective: Color) -> Option<i32> {
    match status {
        GameStatus::Ongoing => None,
        GameStatus::Over {
            winner: Some(winner),
            ..
        } if winner == perspective => Some(WIN_SCORE),
        GameStatus::Over {
            winner: Some(_), ..
        } => Some(-WIN_SCORE),
        GameStatus::Over { winner: None, .. } => Some(DRAW_SCORE),
    }
}

/// A learned scorer backed by the heuristic.
///
/// If the learned scorer is missing or fails, the heuristic answers instead,
/// so this evaluator never errors.
pub struct LayeredEvaluator {
    learned: Option<Box<dyn Evaluator>>,
    heuristic: HeuristicEvaluator,
}

impl LayeredEvaluator {
    pub fn new(heuristic: HeuristicEvaluator) -> Self {
        LayeredEvaluator {
            learned: None,
            heuristic,
        }
    }

    pub fn with_learned(mut self, learned: Box<dyn Evaluator>) -> Self {
        self.learned = Some(learned);
        self
    }

    pub fn has_learned(&self) -> bool {
        self.learned.is_some()
    }
}

impl Default for LayeredEvaluator {
    fn default() -> Self {
        Self::new(HeuristicEvaluator::default())
    }
}

impl Evaluator for LayeredEvaluator {
    fn name(&self) -> &str {
        match &self.learned {
            Some(learned) => learned.name(),
            None => self.heuristic.name(),
        }
    }

    fn evaluate(&self, position: &AtomicPosition, perspective: Color) -> Result<i32, EvalError> {
        if let Some(learned) = &self.learned {
            match learned.evaluate(position, perspective) {
                Ok(score) => return Ok(score),
                Err(e) => {
                    tracing::debug!("{} failed, using heuristic: {}", learned.name(), e);
                }
            }
        }
        self.heuristic.evaluate(position, perspective)
    }
}
