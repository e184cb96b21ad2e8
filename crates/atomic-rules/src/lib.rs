//! Atomic chess rules on top of the bitboard engine.
//!
//! Every capture sets off an explosion that clears the 3x3 block around the
//! capture square of everything but pawns. This crate provides:
//! - [`explode`] and [`ExplosionOutcome`] - the blast and its exact reversal
//! - [`check_move`] and [`legal_moves`] - the legality filter that forbids
//!   blowing up your own king
//! - [`detect`] and [`GameStatus`] - terminal detection, king loss first
//! - [`AtomicPosition`] - a position with apply/undo that covers explosions
//!
//! # Example
//!
//! ```
//! use atomic_rules::{AtomicPosition, GameStatus};
//!
//! let mut position = AtomicPosition::new();
//! let mv = position.legal_moves()[0];
//! let applied = position.play(mv).unwrap();
//! assert!(applied.exploded_squares().is_empty());
//! assert_eq!(position.status(), GameStatus::Ongoing);
//! ```

mod error;
pub mod explosion;
pub mod legality;
pub mod terminal;
mod variant;

pub use error::MoveError;
pub use explosion::{blast_zone, explode, ExplosionOutcome, RemovedPiece};
pub use legality::{check_move, legal_destinations, legal_moves, IllegalMoveReason};
pub use terminal::{detect, king_verdict, settled_status, GameStatus, TerminalReason};
pub use variant::{AppliedMove, AtomicPosition};
