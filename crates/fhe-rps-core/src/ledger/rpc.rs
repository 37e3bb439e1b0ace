//! RPC client for the game registry.
//!
//! This module provides a real implementation of `LedgerClient` that talks to
//! a ledger node over JSON-RPC. Method names come from `RpcMethods`, so the
//! same client works against any relay exposing the registry's functions.

use crate::config::{LedgerConfig, RpcMethods};
use crate::crypto::EncryptedMove;
use crate::ledger::traits::{LedgerClient, LedgerError};
use crate::protocol::{Address, GameId, GameSession, TxHash, TxStatus};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

/// RPC client for the game registry contract
pub struct RpcLedgerClient {
    /// HTTP client
    client: Client,
    /// Node RPC URL
    rpc_url: String,
    contract: Address,
    /// Account the node signs submissions with
    sender: Address,
    methods: RpcMethods,
}

impl RpcLedgerClient {
    /// Create a new RPC client submitting as `sender`
    pub fn new(config: &LedgerConfig, sender: Address) -> Self {
        Self {
            client: Client::new(),
            rpc_url: config.rpc_url.clone(),
            contract: config.contract_address,
            sender,
            methods: config.methods.clone(),
        }
    }

    /// Make a JSON-RPC call.
    /// Params are sent as an array containing a single object.
    async fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": [params],
        });

        debug!("[RpcLedgerClient] {} -> {}", method, request);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::NetworkError(e.to_string()))?;

        let result: Value = response
            .json()
            .await
            .map_err(|e| LedgerError::NetworkError(e.to_string()))?;

        debug!("[RpcLedgerClient] {} <- {}", method, result);

        unwrap_response(result)
    }

    fn submission_params(&self, input: &EncryptedMove) -> Value {
        json!({
            "contract": self.contract,
            "from": self.sender,
            "handle": input.handle().to_hex(),
            "proof": input.proof().to_hex(),
        })
    }
}

/// Split a JSON-RPC response into its result or a rejection
fn unwrap_response(response: Value) -> Result<Value, LedgerError> {
    if let Some(error) = response.get("error") {
        let msg = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error");
        return Err(LedgerError::Rejected(msg.to_string()));
    }

    response
        .get("result")
        .cloned()
        .ok_or_else(|| LedgerError::InvalidResponse("No result in response".to_string()))
}

/// Game ids arrive either as JSON numbers or as `0x`-prefixed quantities
fn parse_game_id(value: &Value) -> Result<GameId, LedgerError> {
    if let Some(n) = value.as_u64() {
        return Ok(GameId::new(n));
    }
    let s = value
        .as_str()
        .ok_or_else(|| LedgerError::InvalidResponse(format!("bad game id: {}", value)))?;
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed
        .map(GameId::new)
        .map_err(|e| LedgerError::InvalidResponse(format!("bad game id {:?}: {}", s, e)))
}

fn parse_game_ids(value: &Value) -> Result<Vec<GameId>, LedgerError> {
    value
        .as_array()
        .ok_or_else(|| LedgerError::InvalidResponse("expected an array of game ids".to_string()))?
        .iter()
        .map(parse_game_id)
        .collect()
}

fn parse_tx_hash(value: &Value) -> Result<TxHash, LedgerError> {
    value
        .as_str()
        .ok_or_else(|| LedgerError::InvalidResponse("expected a transaction hash".to_string()))?
        .parse()
        .map_err(|e| LedgerError::InvalidResponse(format!("bad transaction hash: {}", e)))
}

/// Receipt → status. A null receipt means the transaction is not mined yet.
fn parse_receipt(value: &Value) -> TxStatus {
    if value.is_null() {
        return TxStatus::Pending;
    }
    match value.get("status").and_then(|s| s.as_str()) {
        Some("0x1") => TxStatus::Confirmed,
        Some(_) => {
            let reason = value
                .get("revertReason")
                .and_then(|r| r.as_str())
                .unwrap_or("reverted");
            TxStatus::Failed(reason.to_string())
        }
        None => TxStatus::Pending,
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn get_open_games(&self) -> Result<Vec<GameId>, LedgerError> {
        let params = json!({ "contract": self.contract });
        let result = self.call(&self.methods.get_open_games, params).await?;
        parse_game_ids(&result)
    }

    async fn get_player_games(&self, player: &Address) -> Result<Vec<GameId>, LedgerError> {
        let params = json!({
            "contract": self.contract,
            "player": player,
        });
        let result = self.call(&self.methods.get_player_games, params).await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        parse_game_ids(&result)
    }

    async fn get_game(&self, game_id: GameId) -> Result<GameSession, LedgerError> {
        let params = json!({
            "contract": self.contract,
            "game_id": game_id,
        });
        let result = self.call(&self.methods.get_game, params).await?;
        if result.is_null() {
            return Err(LedgerError::GameNotFound(game_id));
        }
        serde_json::from_value(result).map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }

    async fn create_game(&self, input: &EncryptedMove) -> Result<TxHash, LedgerError> {
        let params = self.submission_params(input);
        let result = self.call(&self.methods.create_game, params).await?;
        parse_tx_hash(&result)
    }

    async fn join_game(
        &self,
        game_id: GameId,
        input: &EncryptedMove,
    ) -> Result<TxHash, LedgerError> {
        let mut params = self.submission_params(input);
        params["game_id"] = json!(game_id);
        let result = self.call(&self.methods.join_game, params).await?;
        parse_tx_hash(&result)
    }

    async fn transaction_status(&self, tx_hash: &TxHash) -> Result<TxStatus, LedgerError> {
        let params = json!({ "tx_hash": tx_hash });
        let result = self.call(&self.methods.get_receipt, params).await?;
        Ok(parse_receipt(&result))
    }
}
