//! Rock-Paper-Scissors moves and judging.

use crate::error::GameError;
use crate::protocol::Outcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rock-Paper-Scissors move, encoded as 0/1/2 before encryption
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    /// Plaintext encoding fed to the encryption backend
    pub const fn code(&self) -> u8 {
        match self {
            Move::Rock => 0,
            Move::Paper => 1,
            Move::Scissors => 2,
        }
    }

    /// Check if this move beats the other
    pub fn beats(&self, other: &Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissors) | (Move::Scissors, Move::Paper) | (Move::Paper, Move::Rock)
        )
    }
}

impl TryFrom<u8> for Move {
    type Error = GameError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Move::Rock),
            1 => Ok(Move::Paper),
            2 => Ok(Move::Scissors),
            other => Err(GameError::InvalidMove(other)),
        }
    }
}

impl From<Move> for u8 {
    fn from(mv: Move) -> Self {
        mv.code()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Rock => "Rock",
            Move::Paper => "Paper",
            Move::Scissors => "Scissors",
        };
        f.write_str(name)
    }
}

/// Judge a session from the creator's and joiner's moves
pub fn judge(creator: Move, joiner: Move) -> Outcome {
    if creator == joiner {
        Outcome::Draw
    } else if creator.beats(&joiner) {
        Outcome::CreatorWins
    } else {
        Outcome::JoinerWins
    }
}
