//! Encryption backend abstraction.
//!
//! The homomorphic scheme itself is external. This module defines the narrow
//! surface the coordinator consumes, plus two implementations:
//! - `DisabledBackend`, which never becomes ready
//! - `MockEncryptionBackend`, a hash-masked stand-in for tests and local play

use super::encrypted_move::{CiphertextHandle, EncryptedMove, EncryptionContext, InputProof};
use crate::games::Move;
use async_trait::async_trait;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Errors from the encryption backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncryptionError {
    #[error("Encryption backend not configured")]
    NotConfigured,

    #[error("Encryption backend not initialized")]
    NotInitialized,

    #[error("Backend initialization failed: {0}")]
    InitFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptFailed(String),
}

/// Trait for client-side input encryption
///
/// Implementations can be:
/// - DisabledBackend while no FHE runtime is wired in
/// - MockEncryptionBackend for testing
/// - A relayer-backed FHE client for production
#[async_trait]
pub trait EncryptionBackend: Send + Sync {
    /// One-time setup (key fetch, WASM init, ...). May never complete.
    async fn initialize(&self) -> Result<(), EncryptionError>;

    /// Encrypt `mv` and produce an input proof bound to `context`
    async fn encrypt(
        &self,
        mv: Move,
        context: &EncryptionContext,
    ) -> Result<EncryptedMove, EncryptionError>;
}

/// Backend used while no encryption runtime is configured
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledBackend;

#[async_trait]
impl EncryptionBackend for DisabledBackend {
    async fn initialize(&self) -> Result<(), EncryptionError> {
        Err(EncryptionError::NotConfigured)
    }

    async fn encrypt(
        &self,
        _mv: Move,
        _context: &EncryptionContext,
    ) -> Result<EncryptedMove, EncryptionError> {
        Err(EncryptionError::NotConfigured)
    }
}

/// Shared key standing in for the FHE network key. The mock ledger holds the
/// same key so it can judge without the client ever sending plaintext.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MockFheKey([u8; 32]);

impl MockFheKey {
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// mask = H("fhe-rps/mask" || key || nonce)[0]
    fn mask(&self, nonce: &[u8]) -> u8 {
        let mut hasher = Sha256::new();
        hasher.update(b"fhe-rps/mask");
        hasher.update(self.0);
        hasher.update(nonce);
        hasher.finalize()[0]
    }

    /// proof = H("fhe-rps/proof" || key || handle || contract || submitter)
    fn proof(&self, handle: &CiphertextHandle, context: &EncryptionContext) -> InputProof {
        let mut hasher = Sha256::new();
        hasher.update(b"fhe-rps/proof");
        hasher.update(self.0);
        hasher.update(handle.as_bytes());
        hasher.update(context.contract.as_bytes());
        hasher.update(context.submitter.as_bytes());
        InputProof::from_bytes(hasher.finalize().to_vec())
    }

    /// Encrypt a move code.
    /// handle = nonce(31) || code XOR mask(nonce)
    pub fn seal(&self, mv: Move, context: &EncryptionContext) -> EncryptedMove {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes[..31]);
        bytes[31] = mv.code() ^ self.mask(&bytes[..31]);
        let handle = CiphertextHandle::from_bytes(bytes);
        let proof = self.proof(&handle, context);
        EncryptedMove::new(handle, proof, *context)
    }

    /// Verify the proof of `handle` under `context` and recover the move.
    /// Returns `None` if the proof does not match the pair or the value is
    /// outside the move domain.
    pub fn open(
        &self,
        handle: &CiphertextHandle,
        proof: &InputProof,
        context: &EncryptionContext,
    ) -> Option<Move> {
        if self.proof(handle, context) != *proof {
            return None;
        }
        let bytes = handle.as_bytes();
        let code = bytes[31] ^ self.mask(&bytes[..31]);
        Move::try_from(code).ok()
    }
}

impl fmt::Debug for MockFheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MockFheKey({}..)", hex::encode(&self.0[..4]))
    }
}

/// In-process encryption backend for testing
#[derive(Clone, Debug)]
pub struct MockEncryptionBackend {
    key: MockFheKey,
    fail_init: Option<String>,
}

impl MockEncryptionBackend {
    pub fn new(key: MockFheKey) -> Self {
        Self {
            key,
            fail_init: None,
        }
    }

    /// A backend whose initialization always fails with `reason`
    pub fn failing(key: MockFheKey, reason: impl Into<String>) -> Self {
        Self {
            key,
            fail_init: Some(reason.into()),
        }
    }

    pub fn key(&self) -> MockFheKey {
        self.key
    }
}

#[async_trait]
impl EncryptionBackend for MockEncryptionBackend {
    async fn initialize(&self) -> Result<(), EncryptionError> {
        match &self.fail_init {
            Some(reason) => Err(EncryptionError::InitFailed(reason.clone())),
            None => Ok(()),
        }
    }

    async fn encrypt(
        &self,
        mv: Move,
        context: &EncryptionContext,
    ) -> Result<EncryptedMove, EncryptionError> {
        Ok(self.key.seal(mv, context))
    }
}
