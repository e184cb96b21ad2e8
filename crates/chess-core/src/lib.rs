//! Core types for chess.
//!
//! This crate provides the fundamental types shared by the base rules engine
//! and the atomic variant built on top of it:
//! - [`Piece`] and [`Color`] for piece representation
//! - [`Square`], [`File`], and [`Rank`] for board coordinates, including the
//!   Chebyshev geometry the explosion rules are defined in
//! - [`Move`] for move representation
//! - [`Fen`] for reading and writing positions as text

mod color;
mod fen;
mod mov;
mod piece;
mod square;

pub use color::Color;
pub use fen::{Fen, FenError, CASTLING_LETTERS, STARTPOS};
pub use mov::{Move, MoveFlag, MoveParseError};
pub use piece::Piece;
pub use square::{File, Rank, Square};
