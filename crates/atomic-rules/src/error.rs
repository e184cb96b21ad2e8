use chess_core::Move;
use chess_engine::MakeMoveError;
use thiserror::Error;

use crate::legality::IllegalMoveReason;
use crate::terminal::GameStatus;

/// Why a move was not played. The position is unchanged in every case.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("malformed move: {0}")]
    Malformed(String),

    #[error("illegal move {mv}: {reason}")]
    Illegal {
        mv: Move,
        reason: IllegalMoveReason,
    },

    #[error("the game is already over ({0})")]
    GameOver(GameStatus),

    #[error(transparent)]
    Engine(#[from] MakeMoveError),
}
