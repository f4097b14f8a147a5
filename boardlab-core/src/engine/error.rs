use thiserror::Error;

use crate::broker::BoardError;

/// Fatal conditions. Any of these aborts the run before a partial result exists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid input at bar {index}: {reason}")]
    InvalidInput { index: usize, reason: String },

    #[error("decision series does not match bars: {0}")]
    MisalignedDecisions(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Board(#[from] BoardError),
}
