//! Typed access to the game registry.
//!
//! Maps transport-level `LedgerError`s onto the recoverable `GameError`
//! taxonomy: read failures become `ReadUnavailable`, synchronous submission
//! refusals become `SubmissionRejected`.

use super::traits::{LedgerClient, LedgerError};
use crate::config::LedgerConfig;
use crate::error::GameError;
use crate::protocol::{
    Address, GameId, GameSession, LedgerOperation, PendingTransaction, TxStatus,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct LedgerGateway {
    client: Arc<dyn LedgerClient>,
    contract: Address,
}

impl LedgerGateway {
    pub fn new(client: Arc<dyn LedgerClient>, config: &LedgerConfig) -> Self {
        Self {
            client,
            contract: config.contract_address,
        }
    }

    /// Registry contract this gateway submits to
    pub fn contract(&self) -> Address {
        self.contract
    }

    pub async fn read_open_games(&self) -> Result<BTreeSet<GameId>, GameError> {
        let games = self.client.get_open_games().await.map_err(read_error)?;
        debug!("Ledger reports {} open games", games.len());
        Ok(games.into_iter().collect())
    }

    /// Games `player` created or joined, in ledger order. Empty for unknown
    /// players.
    pub async fn read_player_games(&self, player: &Address) -> Result<Vec<GameId>, GameError> {
        self.client
            .get_player_games(player)
            .await
            .map_err(read_error)
    }

    pub async fn read_game(&self, game_id: GameId) -> Result<GameSession, GameError> {
        self.client.get_game(game_id).await.map_err(read_error)
    }

    /// Submit a write. Returning a handle only means the node accepted the
    /// call; resolution must be polled with `transaction_status`.
    pub async fn submit(
        &self,
        operation: LedgerOperation,
    ) -> Result<PendingTransaction, GameError> {
        let bound = operation.input().context().contract;
        if bound != self.contract {
            return Err(GameError::SubmissionRejected(format!(
                "input bound to contract {} but registry is {}",
                bound, self.contract
            )));
        }

        let result = match &operation {
            LedgerOperation::CreateGame { input } => self.client.create_game(input).await,
            LedgerOperation::JoinGame { game_id, input } => {
                self.client.join_game(*game_id, input).await
            }
        };

        match result {
            Ok(tx_hash) => {
                let pending = PendingTransaction::new(tx_hash, &operation);
                info!(
                    "Submitted {} as {} (submission {})",
                    pending.operation, pending.tx_hash, pending.submission_id
                );
                Ok(pending)
            }
            Err(e) => {
                warn!("{} rejected: {}", operation.name(), e);
                Err(GameError::SubmissionRejected(e.to_string()))
            }
        }
    }

    pub async fn transaction_status(
        &self,
        pending: &PendingTransaction,
    ) -> Result<TxStatus, GameError> {
        match self.client.transaction_status(&pending.tx_hash).await {
            Ok(status) => Ok(status),
            // Not seen by the node yet
            Err(LedgerError::TransactionNotFound(_)) => Ok(TxStatus::Pending),
            Err(e) => Err(read_error(e)),
        }
    }
}

fn read_error(e: LedgerError) -> GameError {
    warn!("Ledger read failed: {}", e);
    GameError::ReadUnavailable(e.to_string())
}
