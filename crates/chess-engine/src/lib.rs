//! Bitboard chess engine: the standard rules the atomic variant builds on.
//!
//! This crate provides:
//! - [`Bitboard`] - 64-bit square sets
//! - [`Position`] - board, side to move, castling, en passant and clocks;
//!   tolerant of a missing king
//! - move generation, attack detection, and copying or in-place move
//!   application with exact undo
//! - the draw conditions visible in a single position
//! - Zobrist hashing for repetition detection
//!
//! # Example
//!
//! ```
//! use chess_engine::{generate_moves, make_move_in_place, unmake_move, Position};
//!
//! let mut position = Position::startpos();
//! let snapshot = position.clone();
//! let first = generate_moves(&position)[0];
//!
//! let undo = make_move_in_place(&mut position, first).unwrap();
//! unmake_move(&mut position, undo);
//! assert_eq!(position, snapshot);
//! ```

mod bitboard;
mod draw;
pub mod movegen;
mod position;
mod zobrist;

pub use bitboard::Bitboard;
pub use draw::{insufficient_material, seventy_five_move_rule, SEVENTY_FIVE_MOVE_PLIES};
pub use movegen::{
    bishop_attacks, generate_moves, generate_pseudo_moves, is_king_attacked, is_square_attacked,
    king_attacks, knight_attacks, make_move, make_move_in_place, pawn_attacks, queen_attacks,
    rook_attacks, unmake_move, MakeMoveError, MoveList, UndoInfo,
};
pub use position::{CastlingRights, Position};
