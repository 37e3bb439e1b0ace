//! Ledger access: client trait, mock and RPC clients, typed gateway.

mod gateway;
mod mock;
mod rpc;
mod traits;

pub use gateway::LedgerGateway;
pub use mock::{MockLedgerClient, RecordedSubmission};
pub use rpc::RpcLedgerClient;
pub use traits::{LedgerClient, LedgerError};
