//! Move search for atomic chess.
//!
//! Two searches share one [`Evaluator`] interface: a fixed-depth alpha-beta
//! and a time-bounded Monte Carlo tree search. [`search`] picks one from a
//! [`SearchBudget`] and always comes back with a legal move when one exists.
//!
//! # Example
//!
//! ```
//! use atomic_ai::{search, LayeredEvaluator, SearchBudget};
//! use atomic_rules::AtomicPosition;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let position = AtomicPosition::new();
//! let evaluator = LayeredEvaluator::default();
//! let mut rng = StdRng::seed_from_u64(1);
//!
//! let outcome = search(&position, SearchBudget::AlphaBeta { depth: 1 }, &evaluator, &mut rng)
//!     .unwrap();
//! assert!(position.legal_moves().contains(outcome.best_move));
//! ```

pub mod alphabeta;
pub mod eval;
pub mod mcts;

mod error;

pub use alphabeta::{AlphaBeta, AlphaBetaResult};
pub use error::SearchError;
pub use eval::{
    ConvScorer, ConvWeights, EvalError, Evaluator, HeuristicEvaluator, HeuristicWeights,
    LayeredEvaluator, DRAW_SCORE, WIN_SCORE,
};
pub use mcts::{Mcts, MctsConfig, MctsResult, EXPLORATION_CONSTANT};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use atomic_rules::AtomicPosition;
use chess_core::Move;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

const DEFAULT_SIMULATIONS: u32 = 1000;

/// How much work a search may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBudget {
    AlphaBeta { depth: u8 },
    Mcts {
        time_limit: Duration,
        simulations: u32,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BudgetParseError {
    #[error("unknown search kind: {0}")]
    UnknownKind(String),
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    #[error("expected ab:<depth> or mcts:<millis>[:<simulations>], got {0}")]
    Malformed(String),
}

impl FromStr for SearchBudget {
    type Err = BudgetParseError;

    /// Parses `ab:<depth>` or `mcts:<millis>[:<simulations>]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let number = |part: &str| {
            part.parse::<u64>()
                .map_err(|_| BudgetParseError::InvalidNumber(part.to_string()))
        };

        match parts.as_slice() {
            ["ab", depth] => {
                let depth = u8::try_from(number(depth)?)
                    .map_err(|_| BudgetParseError::InvalidNumber(depth.to_string()))?;
                Ok(SearchBudget::AlphaBeta { depth })
            }
            ["mcts", millis] => Ok(SearchBudget::Mcts {
                time_limit: Duration::from_millis(number(millis)?),
                simulations: DEFAULT_SIMULATIONS,
            }),
            ["mcts", millis, simulations] => {
                let simulations = u32::try_from(number(simulations)?)
                    .map_err(|_| BudgetParseError::InvalidNumber(simulations.to_string()))?;
                Ok(SearchBudget::Mcts {
                    time_limit: Duration::from_millis(number(millis)?),
                    simulations,
                })
            }
            [kind, ..] if *kind != "ab" && *kind != "mcts" => {
                Err(BudgetParseError::UnknownKind(kind.to_string()))
            }
            _ => Err(BudgetParseError::Malformed(s.to_string())),
        }
    }
}

impl fmt::Display for SearchBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchBudget::AlphaBeta { depth } => write!(f, "ab:{}", depth),
            SearchBudget::Mcts {
                time_limit,
                simulations,
            } => write!(f, "mcts:{}:{}", time_limit.as_millis(), simulations),
        }
    }
}

/// Tuning that is not part of the budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub rollout_cap: u32,
    pub exploration: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        let mcts = MctsConfig::default();
        SearchOptions {
            rollout_cap: mcts.rollout_cap,
            exploration: mcts.exploration,
        }
    }
}

/// Which search produced a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    AlphaBeta,
    Mcts,
    /// The search failed and a random legal move was played.
    Random,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::AlphaBeta => write!(f, "alpha-beta"),
            Strategy::Mcts => write!(f, "mcts"),
            Strategy::Random => write!(f, "random"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    pub best_move: Move,
    /// For the side to move.
    pub score: i32,
    pub nodes: u64,
    pub strategy: Strategy,
}

/// Chooses a move for the side to move.
///
/// Returns `None` only when there is nothing to play: no legal move, or a
/// king already lost. Internal failures never surface here.
pub fn search<R: Rng + ?Sized>(
    position: &AtomicPosition,
    budget: SearchBudget,
    evaluator: &dyn Evaluator,
    rng: &mut R,
) -> Option<SearchOutcome> {
    search_with(position, budget, SearchOptions::default(), evaluator, rng)
}

pub fn search_with<R: Rng + ?Sized>(
    position: &AtomicPosition,
    budget: SearchBudget,
    options: SearchOptions,
    evaluator: &dyn Evaluator,
    rng: &mut R,
) -> Option<SearchOutcome> {
    if position.king_verdict().is_some() {
        return None;
    }
    let legal = position.legal_moves();
    let first = legal.iter().next().copied()?;

    tracing::debug!("searching {} with {}", position.to_fen(), budget);

    match budget {
        SearchBudget::AlphaBeta { depth } => {
            let result = AlphaBeta::new(evaluator).search(position, depth);
            Some(SearchOutcome {
                best_move: result.best_move.unwrap_or(first),
                score: result.score,
                nodes: result.nodes,
                strategy: Strategy::AlphaBeta,
            })
        }
        SearchBudget::Mcts {
            time_limit,
            simulations,
        } => {
            let config = MctsConfig {
                time_limit,
                simulations,
                exploration: options.exploration,
                rollout_cap: options.rollout_cap,
            };
            match Mcts::new(evaluator, config).search(position, rng) {
                Ok(Some(result)) => Some(SearchOutcome {
                    best_move: result.best_move,
                    score: result.score,
                    nodes: result.simulations,
                    strategy: Strategy::Mcts,
                }),
                Ok(None) => {
                    tracing::warn!("mcts finished without a move, playing randomly");
                    random_move(legal.as_slice(), rng)
                }
                Err(e) => {
                    tracing::warn!("mcts failed, playing randomly: {}", e);
                    random_move(legal.as_slice(), rng)
                }
            }
        }
    }
}

fn random_move<R: Rng + ?Sized>(moves: &[Move], rng: &mut R) -> Option<SearchOutcome> {
    moves.choose(rng).map(|&best_move| SearchOutcome {
        best_move,
        score: 0,
        nodes: 0,
        strategy: Strategy::Random,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn parse_budgets() {
        assert_eq!(
            "ab:3".parse::<SearchBudget>(),
            Ok(SearchBudget::AlphaBeta { depth: 3 })
        );
        assert_eq!(
            "mcts:1500".parse::<SearchBudget>(),
            Ok(SearchBudget::Mcts {
                time_limit: Duration::from_millis(1500),
                simulations: 1000
            })
        );
        assert_eq!(
            "mcts:200:50".parse::<SearchBudget>(),
            Ok(SearchBudget::Mcts {
                time_limit: Duration::from_millis(200),
                simulations: 50
            })
        );
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            "minimax:3".parse::<SearchBudget>(),
            Err(BudgetParseError::UnknownKind(_))
        ));
        assert!(matches!(
            "ab:x".parse::<SearchBudget>(),
            Err(BudgetParseError::InvalidNumber(_))
        ));
        assert!(matches!(
            "ab:300".parse::<SearchBudget>(),
            Err(BudgetParseError::InvalidNumber(_))
        ));
        assert!(matches!(
            "ab".parse::<SearchBudget>(),
            Err(BudgetParseError::Malformed(_))
        ));
    }

    #[test]
    fn budget_display_parses_back() {
        let budget = SearchBudget::Mcts {
            time_limit: Duration::from_millis(250),
            simulations: 40,
        };
        assert_eq!(budget.to_string(), "mcts:250:40");
        assert_eq!(budget.to_string().parse::<SearchBudget>(), Ok(budget));
    }

    #[test]
    fn alpha_beta_dispatch() {
        let position = AtomicPosition::from_fen("8/8/8/8/8/2k5/3n4/3Q2K1 w - - 0 1").unwrap();
        let evaluator = LayeredEvaluator::default();
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = search(
            &position,
            SearchBudget::AlphaBeta { depth: 2 },
            &evaluator,
            &mut rng,
        )
        .unwrap();
        assert_eq!(outcome.best_move.to_uci(), "d1d2");
        assert_eq!(outcome.strategy, Strategy::AlphaBeta);
    }

    #[test]
    fn depth_zero_still_plays() {
        let position = AtomicPosition::new();
        let evaluator = LayeredEvaluator::default();
        let outcome = search(
            &position,
            SearchBudget::AlphaBeta { depth: 0 },
            &evaluator,
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();
        assert_eq!(Some(outcome.best_move), position.legal_moves().iter().next().copied());
        assert_eq!(outcome.nodes, 0);
    }

    #[test]
    fn mcts_dispatch() {
        let position = AtomicPosition::new();
        let evaluator = LayeredEvaluator::default();
        let outcome = search(
            &position,
            SearchBudget::Mcts {
                time_limit: Duration::from_secs(10),
                simulations: 30,
            },
            &evaluator,
            &mut StdRng::seed_from_u64(4),
        )
        .unwrap();
        assert_eq!(outcome.strategy, Strategy::Mcts);
        assert_eq!(outcome.nodes, 30);
        assert!(position.legal_moves().contains(outcome.best_move));
    }

    #[test]
    fn empty_mcts_falls_back_to_random() {
        let position = AtomicPosition::new();
        let evaluator = LayeredEvaluator::default();
        let outcome = search(
            &position,
            SearchBudget::Mcts {
                time_limit: Duration::from_secs(1),
                simulations: 0,
            },
            &evaluator,
            &mut StdRng::seed_from_u64(4),
        )
        .unwrap();
        assert_eq!(outcome.strategy, Strategy::Random);
        assert!(position.legal_moves().contains(outcome.best_move));
    }

    #[test]
    fn nothing_to_play() {
        let evaluator = LayeredEvaluator::default();
        let mut rng = StdRng::seed_from_u64(0);
        let budget = SearchBudget::AlphaBeta { depth: 2 };

        let stalemated = AtomicPosition::from_fen("k7/1R6/8/2K5/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(search(&stalemated, budget, &evaluator, &mut rng), None);

        let kingless = AtomicPosition::from_fen("4k3/8/8/8/8/8/8/3Q4 w - - 0 1").unwrap();
        assert_eq!(search(&kingless, budget, &evaluator, &mut rng), None);
    }

    #[test]
    fn outcome_serializes() {
        let outcome = SearchOutcome {
            best_move: Move::from_uci("e2e4").unwrap(),
            score: 12,
            nodes: 20,
            strategy: Strategy::AlphaBeta,
        };
        let json = serde_json::to_value(outcome).unwrap();
        assert_eq!(json["best_move"], "e2e4");
        assert_eq!(json["strategy"], "alpha_beta");
    }
}
