//! Ledger write operations and transaction handles.

use crate::crypto::EncryptedMove;
use crate::protocol::{GameId, TxHash};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A write against the game registry contract
#[derive(Debug)]
pub enum LedgerOperation {
    /// createGame(handle, proof)
    CreateGame { input: EncryptedMove },
    /// joinGame(gameId, handle, proof)
    JoinGame { game_id: GameId, input: EncryptedMove },
}

impl LedgerOperation {
    pub fn input(&self) -> &EncryptedMove {
        match self {
            LedgerOperation::CreateGame { input } | LedgerOperation::JoinGame { input, .. } => {
                input
            }
        }
    }

    /// Target game for joins
    pub fn game_id(&self) -> Option<GameId> {
        match self {
            LedgerOperation::CreateGame { .. } => None,
            LedgerOperation::JoinGame { game_id, .. } => Some(*game_id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LedgerOperation::CreateGame { .. } => "createGame",
            LedgerOperation::JoinGame { .. } => "joinGame",
        }
    }
}

/// Handle to a submitted transaction whose outcome is not yet known.
/// Holding one says nothing about ledger-side success.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    /// Local identifier, unique per submission
    pub submission_id: Uuid,
    pub tx_hash: TxHash,
    /// Contract function that was called
    pub operation: String,
    pub game_id: Option<GameId>,
}

impl PendingTransaction {
    pub fn new(tx_hash: TxHash, operation: &LedgerOperation) -> Self {
        Self {
            submission_id: Uuid::new_v4(),
            tx_hash,
            operation: operation.name().to_string(),
            game_id: operation.game_id(),
        }
    }
}

/// Ledger-side resolution of a submitted transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    /// Not yet included (or unknown to the node so far)
    Pending,
    Confirmed,
    /// Reverted or dropped
    Failed(String),
}

impl TxStatus {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }
}
