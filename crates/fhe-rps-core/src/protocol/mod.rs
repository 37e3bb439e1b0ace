//! Protocol types and ledger messages.

mod messages;
mod types;

pub use messages::{LedgerOperation, PendingTransaction, TxStatus};
pub use types::{Address, GameId, GameSession, GameStatus, HexParseError, Outcome, TxHash};
