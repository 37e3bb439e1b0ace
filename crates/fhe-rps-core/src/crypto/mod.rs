//! Client-side encryption of moves.
//!
//! This module provides:
//! - EncryptedMove, CiphertextHandle and InputProof payload types
//! - EncryptionBackend trait with disabled and mock backends
//! - EncryptedInputBuilder with readiness tracking

mod backend;
mod builder;
mod encrypted_move;

pub use backend::{
    DisabledBackend, EncryptionBackend, EncryptionError, MockEncryptionBackend, MockFheKey,
};
pub use builder::{BackendStatus, EncryptedInputBuilder};
pub use encrypted_move::{CiphertextHandle, EncryptedMove, EncryptionContext, InputProof};
