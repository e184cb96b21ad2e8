//! Atomic chess game sessions.
//!
//! A [`GameSession`] owns one game: it validates and commits human moves,
//! runs the engine for its own turns and answers move-hint queries. Engine
//! settings come from an [`EngineConfig`], usually loaded from `atomic.toml`.
//!
//! # Example
//!
//! ```
//! use atomic_session::{EngineConfig, GameSession};
//!
//! let mut game = GameSession::new(EngineConfig::default());
//! let report = game.apply_validated_move("e2e4").unwrap();
//! assert!(report.exploded.is_empty());
//! assert_eq!(report.result, "*");
//! ```

pub mod config;
mod report;
mod session;

pub use config::{ConfigError, Difficulty, EngineConfig};
pub use report::{occupants, AiMoveReport, MoveReport, Occupant};
pub use session::{GameSession, SessionError, FIVEFOLD};
