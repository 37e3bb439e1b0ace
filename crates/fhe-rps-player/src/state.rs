//! Application state for the player service.

use crate::config::{FheBackendKind, LedgerBackendKind, PlayerConfig};
use fhe_rps_core::crypto::{
    DisabledBackend, EncryptedInputBuilder, EncryptionBackend, MockEncryptionBackend, MockFheKey,
};
use fhe_rps_core::ledger::{LedgerClient, LedgerGateway, MockLedgerClient, RpcLedgerClient};
use fhe_rps_core::GameCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<GameCoordinator>,
}

impl AppState {
    pub fn new(coordinator: Arc<GameCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Wire the backends `config` asks for. The mock ledger and mock
    /// encryption backend share one key so proofs verify.
    pub fn from_config(config: &PlayerConfig) -> Self {
        let key = MockFheKey::random();

        let backend: Arc<dyn EncryptionBackend> = match config.fhe_backend {
            FheBackendKind::Disabled => Arc::new(DisabledBackend),
            FheBackendKind::Mock => Arc::new(MockEncryptionBackend::new(key)),
        };
        let client: Arc<dyn LedgerClient> = match config.ledger_backend {
            LedgerBackendKind::Rpc => {
                info!("Ledger RPC: {}", config.ledger.rpc_url);
                Arc::new(RpcLedgerClient::new(&config.ledger, config.player))
            }
            LedgerBackendKind::Mock => {
                info!("Ledger: in-process mock registry");
                let ledger = MockLedgerClient::new(config.ledger.contract_address, key);
                Arc::new(ledger.for_player(config.player))
            }
        };

        let builder = Arc::new(EncryptedInputBuilder::new(backend));
        let gateway = LedgerGateway::new(client, &config.ledger);
        Self::new(Arc::new(GameCoordinator::new(
            config.player,
            builder,
            gateway,
        )))
    }

    /// Start backend setup in the background
    pub fn spawn_initialize(&self) {
        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            // Failure is published through the builder's status
            let _ = coordinator.builder().initialize().await;
        });
    }

    /// Keep the session views and last submission current
    pub fn spawn_poller(&self, every: Duration) {
        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            // `interval` panics on a zero period
            let mut interval = tokio::time::interval(every.max(Duration::from_millis(1)));
            loop {
                interval.tick().await;
                if let Err(e) = coordinator.refresh_sessions().await {
                    debug!("Background refresh failed: {}", e);
                }
                if let Err(e) = coordinator.poll_submission().await {
                    debug!("Submission poll failed: {}", e);
                }
            }
        });
    }
}
