//! Encrypted input builder.
//!
//! Wraps an `EncryptionBackend` with readiness tracking. Backend setup runs
//! once via `initialize`; its progress is published on a watch channel so
//! callers can either fail fast (`build`) or suspend until ready
//! (`wait_ready`).

use super::backend::{EncryptionBackend, EncryptionError};
use super::encrypted_move::{EncryptedMove, EncryptionContext};
use crate::error::GameError;
use crate::games::Move;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Readiness of the encryption backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendStatus {
    Initializing,
    Ready,
    Unavailable(String),
}

pub struct EncryptedInputBuilder {
    backend: Arc<dyn EncryptionBackend>,
    status: watch::Sender<BackendStatus>,
}

impl EncryptedInputBuilder {
    pub fn new(backend: Arc<dyn EncryptionBackend>) -> Self {
        let (status, _) = watch::channel(BackendStatus::Initializing);
        Self { backend, status }
    }

    /// Run backend setup. Safe to call again after a failure; a no-op once
    /// the backend is ready.
    pub async fn initialize(&self) -> Result<(), GameError> {
        if self.is_ready() {
            return Ok(());
        }
        match self.backend.initialize().await {
            Ok(()) => {
                info!("Encryption backend ready");
                self.status.send_replace(BackendStatus::Ready);
                Ok(())
            }
            Err(e) => {
                warn!("Encryption backend unavailable: {}", e);
                self.status
                    .send_replace(BackendStatus::Unavailable(e.to_string()));
                Err(GameError::EncryptionUnavailable(e.to_string()))
            }
        }
    }

    pub fn status(&self) -> BackendStatus {
        self.status.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        *self.status.borrow() == BackendStatus::Ready
    }

    /// Suspend until the backend is ready. Returns an error as soon as setup
    /// is known to have failed. Never times out on its own; wrap it in
    /// `tokio::time::timeout` for a deadline.
    pub async fn wait_ready(&self) -> Result<(), GameError> {
        let mut rx = self.status.subscribe();
        loop {
            let status = rx.borrow_and_update().clone();
            match status {
                BackendStatus::Ready => return Ok(()),
                BackendStatus::Unavailable(reason) => {
                    return Err(GameError::EncryptionUnavailable(reason))
                }
                BackendStatus::Initializing => {
                    if rx.changed().await.is_err() {
                        return Err(GameError::EncryptionUnavailable(
                            EncryptionError::NotInitialized.to_string(),
                        ));
                    }
                }
            }
        }
    }

    /// Encrypt `mv` bound to `context`. Fails fast if the backend is not ready.
    pub async fn build(
        &self,
        mv: Move,
        context: &EncryptionContext,
    ) -> Result<EncryptedMove, GameError> {
        match self.status() {
            BackendStatus::Ready => {}
            BackendStatus::Initializing => {
                return Err(GameError::EncryptionUnavailable(
                    EncryptionError::NotInitialized.to_string(),
                ))
            }
            BackendStatus::Unavailable(reason) => {
                return Err(GameError::EncryptionUnavailable(reason))
            }
        }

        let encrypted = self
            .backend
            .encrypt(mv, context)
            .await
            .map_err(|e| GameError::EncryptionUnavailable(e.to_string()))?;

        if encrypted.context() != context {
            return Err(GameError::EncryptionUnavailable(
                "backend bound the input to a different contract/submitter pair".to_string(),
            ));
        }

        debug!(
            "Built encrypted input {:?} for {}",
            encrypted.handle(),
            context.submitter
        );
        Ok(encrypted)
    }

    /// Same as `build`, for a raw move code coming from the presentation layer
    pub async fn build_code(
        &self,
        code: u8,
        context: &EncryptionContext,
    ) -> Result<EncryptedMove, GameError> {
        let mv = Move::try_from(code)?;
        self.build(mv, context).await
    }
}
