use chess_engine::MakeMoveError;
use thiserror::Error;

use crate::eval::EvalError;

/// Failures inside a search. Callers of [`search`](crate::search) never see
/// these; they are logged and the search degrades to a fallback move.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("failed to apply move: {0}")]
    Apply(#[from] MakeMoveError),
    #[error("evaluation failed: {0}")]
    Eval(#[from] EvalError),
    #[error("every branch failed")]
    AllBranchesFailed,
}
