//! A single game of atomic chess.

use std::collections::BTreeSet;

use atomic_ai::{search_with, Evaluator, LayeredEvaluator, SearchBudget};
use atomic_rules::{AtomicPosition, GameStatus, MoveError, TerminalReason};
use chess_core::{Color, FenError, Move, Square};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::report::{AiMoveReport, MoveReport};

/// Occurrences of one position that end the game.
pub const FIVEFOLD: usize = 5;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error("invalid square: {0}")]
    InvalidSquare(String),
    #[error(transparent)]
    Fen(#[from] FenError),
    #[error("no legal moves")]
    NoLegalMoves,
}

/// One game and the engine that plays in it.
///
/// The session owns its position outright. Moves are validated and applied
/// on a copy, so a rejected move leaves the game exactly as it was.
pub struct GameSession {
    config: EngineConfig,
    evaluator: LayeredEvaluator,
    rng: StdRng,
    position: AtomicPosition,
    /// Zobrist hash of every position reached, the current one last.
    history: Vec<u64>,
    status: GameStatus,
}

impl GameSession {
    /// A game from the starting position.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_position(config, AtomicPosition::new())
    }

    pub fn from_fen(config: EngineConfig, fen: &str) -> Result<Self, SessionError> {
        let position = AtomicPosition::from_fen(fen)?;
        Ok(Self::with_position(config, position))
    }

    fn with_position(config: EngineConfig, position: AtomicPosition) -> Self {
        let evaluator = config.evaluator();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut session = GameSession {
            config,
            evaluator,
            rng,
            position,
            history: Vec::new(),
            status: GameStatus::Ongoing,
        };
        session.begin();
        session
    }

    /// Starts over from the starting position.
    pub fn reset(&mut self) {
        self.position = AtomicPosition::new();
        self.begin();
    }

    /// Opens a game at the current position: fresh history and status.
    fn begin(&mut self) {
        self.history.clear();
        self.history.push(self.position.position().zobrist_hash());
        self.status = self.detect_status();
        tracing::info!("New game: {}", self.position.to_fen());
    }

    pub fn fen(&self) -> String {
        self.position.to_fen()
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    pub fn position(&self) -> &AtomicPosition {
        &self.position
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Plays a move given in UCI notation (`e2e4`, `e7e8q`).
    ///
    /// # Errors
    ///
    /// Malformed input, a finished game and a move rejected by the legality
    /// filter all leave the session untouched.
    pub fn apply_validated_move(&mut self, uci: &str) -> Result<MoveReport, SessionError> {
        let parsed = Move::from_uci(uci.trim())
            .map_err(|e| MoveError::Malformed(format!("{}: {}", uci.trim(), e)))?;
        self.ensure_ongoing()?;
        let m = self
            .position
            .resolve_move(parsed.from(), parsed.to(), parsed.promotion())?;
        self.commit(m)
    }

    /// Searches for a move and plays it.
    ///
    /// Without a budget the configured difficulty decides. The search works
    /// on a copy; only the chosen move touches the session.
    pub fn compute_ai_move(
        &mut self,
        budget: Option<SearchBudget>,
    ) -> Result<AiMoveReport, SessionError> {
        self.ensure_ongoing()?;
        let budget = budget.unwrap_or_else(|| self.config.difficulty.budget());
        tracing::debug!(
            "Searching for {} with {} ({})",
            self.side_to_move(),
            budget,
            self.evaluator.name()
        );

        let snapshot = self.position.clone();
        let outcome = search_with(
            &snapshot,
            budget,
            self.config.search_options(),
            &self.evaluator,
            &mut self.rng,
        )
        .ok_or(SessionError::NoLegalMoves)?;

        let report = self.commit(outcome.best_move)?;
        Ok(AiMoveReport {
            report,
            score: outcome.score,
            nodes: outcome.nodes,
            strategy: outcome.strategy,
        })
    }

    /// Where the piece on `square` may legally go.
    ///
    /// Empty for an empty square, a piece of the side not to move, or a
    /// finished game.
    pub fn legal_destinations(&self, square: &str) -> Result<BTreeSet<Square>, SessionError> {
        let sq = Square::from_algebraic(square.trim())
            .ok_or_else(|| SessionError::InvalidSquare(square.to_string()))?;
        if self.status.is_over() {
            return Ok(BTreeSet::new());
        }
        match self.position.piece_at(sq) {
            Some((_, color)) if color == self.side_to_move() => {
                Ok(self.position.legal_destinations(sq))
            }
            _ => Ok(BTreeSet::new()),
        }
    }

    fn ensure_ongoing(&self) -> Result<(), SessionError> {
        if self.status.is_over() {
            return Err(MoveError::GameOver(self.status).into());
        }
        Ok(())
    }

    /// Validates and applies `m` on a copy, then swaps it in.
    fn commit(&mut self, m: Move) -> Result<MoveReport, SessionError> {
        let mut next = self.position.clone();
        let applied = next.play(m)?;
        let exploded = applied.exploded_squares();

        self.position = next;
        self.history.push(self.position.position().zobrist_hash());
        self.status = self.detect_status();

        if exploded.is_empty() {
            tracing::info!("Played {}", m);
        } else {
            tracing::info!("Played {}, exploded {:?}", m, exploded);
        }
        if self.status.is_over() {
            tracing::info!("Game over: {} ({})", self.status.result_string(), self.status);
        }

        Ok(MoveReport::new(m, &self.position, exploded, self.status))
    }

    fn detect_status(&self) -> GameStatus {
        let status = self.position.status();
        if status.is_over() {
            return status;
        }
        if self.repetitions() >= FIVEFOLD {
            return GameStatus::draw(TerminalReason::FivefoldRepetition);
        }
        GameStatus::Ongoing
    }

    /// How often the current position has occurred.
    fn repetitions(&self) -> usize {
        let Some(&current) = self.history.last() else {
            return 0;
        };
        self.history.iter().filter(|&&h| h == current).count()
    }
}
