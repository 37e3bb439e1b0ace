//! Ledger client trait definition.

use crate::crypto::EncryptedMove;
use crate::protocol::{Address, GameId, GameSession, TxHash, TxStatus};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from ledger operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Game not found: {0}")]
    GameNotFound(GameId),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TxHash),

    #[error("Rejected by ledger: {0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Trait for game registry contract access
///
/// This trait abstracts the contract surface the coordinator needs.
/// Implementations can be:
/// - MockLedgerClient for testing
/// - RpcLedgerClient for a JSON-RPC node
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// getOpenGames()
    async fn get_open_games(&self) -> Result<Vec<GameId>, LedgerError>;

    /// getPlayerGames(address), in ledger order
    async fn get_player_games(&self, player: &Address) -> Result<Vec<GameId>, LedgerError>;

    /// Full session record
    async fn get_game(&self, game_id: GameId) -> Result<GameSession, LedgerError>;

    /// createGame(handle, proof). Returns once the node accepted the call.
    async fn create_game(&self, input: &EncryptedMove) -> Result<TxHash, LedgerError>;

    /// joinGame(gameId, handle, proof)
    async fn join_game(&self, game_id: GameId, input: &EncryptedMove)
        -> Result<TxHash, LedgerError>;

    /// Resolution of a previously submitted transaction
    async fn transaction_status(&self, tx_hash: &TxHash) -> Result<TxStatus, LedgerError>;
}
