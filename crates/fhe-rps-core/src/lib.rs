//! FHE Rock-Paper-Scissors Core Library
//!
//! This crate provides the encrypted game-session coordinator: client-side
//! move encryption, typed ledger access, the session cache, and the
//! create/join state machine the presentation layer drives.

pub mod config;
pub mod coordinator;
pub mod crypto;
pub mod error;
pub mod games;
pub mod ledger;
pub mod protocol;
pub mod session;

pub use config::LedgerConfig;
pub use coordinator::{CoordinatorPhase, CoordinatorState, GameCoordinator};
pub use crypto::{EncryptedInputBuilder, EncryptedMove, EncryptionBackend, EncryptionContext};
pub use error::GameError;
pub use games::Move;
pub use ledger::{LedgerClient, LedgerError, LedgerGateway, MockLedgerClient, RpcLedgerClient};
pub use protocol::{Address, GameId, GameSession, GameStatus, Outcome, PendingTransaction, TxStatus};
pub use session::{SessionSnapshot, SessionStateStore};
