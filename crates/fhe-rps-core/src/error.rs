//! Errors surfaced to the presentation layer.
//!
//! Every variant is recoverable: the coordinator is left in a stable state
//! and the error is attached to its state as data.

use crate::protocol::GameId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from coordinator operations
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum GameError {
    #[error("Invalid move: {0} (expected 0 = Rock, 1 = Paper, 2 = Scissors)")]
    InvalidMove(u8),

    #[error("Encryption unavailable: {0}")]
    EncryptionUnavailable(String),

    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("Ledger read unavailable: {0}")]
    ReadUnavailable(String),

    #[error("Game {0} is not open")]
    GameNotOpen(GameId),

    #[error("A submission is already in flight")]
    AlreadySubmitting,

    #[error("No move selected")]
    NoMoveSelected,
}

impl GameError {
    /// Short machine-readable name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::InvalidMove(_) => "InvalidMove",
            GameError::EncryptionUnavailable(_) => "EncryptionUnavailable",
            GameError::SubmissionRejected(_) => "SubmissionRejected",
            GameError::ReadUnavailable(_) => "ReadUnavailable",
            GameError::GameNotOpen(_) => "GameNotOpen",
            GameError::AlreadySubmitting => "AlreadySubmitting",
            GameError::NoMoveSelected => "NoMoveSelected",
        }
    }
}
