//! Ledger configuration.
//!
//! Contract address and call shape are injected here rather than baked into
//! the gateway.

use crate::protocol::{Address, HexParseError};
use serde::{Deserialize, Serialize};

/// Game registry deployment used when `CONTRACT_ADDRESS` is unset (Sepolia)
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x51f37B180D03d3c95D75879c86BbAB043C691B22";

pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// JSON-RPC method names backing each contract function
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcMethods {
    pub get_open_games: String,
    pub get_player_games: String,
    pub get_game: String,
    pub create_game: String,
    pub join_game: String,
    pub get_receipt: String,
}

impl Default for RpcMethods {
    fn default() -> Self {
        Self {
            get_open_games: "rps_getOpenGames".to_string(),
            get_player_games: "rps_getPlayerGames".to_string(),
            get_game: "rps_getGame".to_string(),
            create_game: "rps_createGame".to_string(),
            join_game: "rps_joinGame".to_string(),
            get_receipt: "rps_getTransactionReceipt".to_string(),
        }
    }
}

/// Where the game registry lives and how to talk to it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub contract_address: Address,
    #[serde(default)]
    pub methods: RpcMethods,
}

impl LedgerConfig {
    pub fn new(rpc_url: impl Into<String>, contract_address: Address) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract_address,
            methods: RpcMethods::default(),
        }
    }

    /// Read `LEDGER_RPC_URL` and `CONTRACT_ADDRESS`, falling back to defaults
    pub fn from_env() -> Result<Self, HexParseError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, with variables resolved through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HexParseError> {
        let rpc_url = lookup("LEDGER_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        let contract_address = lookup("CONTRACT_ADDRESS")
            .as_deref()
            .unwrap_or(DEFAULT_CONTRACT_ADDRESS)
            .parse()?;
        Ok(Self::new(rpc_url, contract_address))
    }
}
