//! Encrypted move payload.
//!
//! An `EncryptedMove` is what the ledger receives in place of a plaintext
//! move: an opaque ciphertext handle plus an input proof. The proof attests
//! that the ciphertext encodes a value in the move domain and that it was
//! produced for one `(contract, submitter)` pair. The ledger rejects the
//! payload if it is replayed under any other pair.

use crate::protocol::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque ciphertext handle as understood by the ledger
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CiphertextHandle([u8; 32]);

impl CiphertextHandle {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle({})", hex::encode(&self.0[..8]))
    }
}

/// Input proof attesting domain and binding of a ciphertext
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputProof(Vec<u8>);

impl InputProof {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for InputProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = &self.0[..self.0.len().min(8)];
        write!(f, "InputProof({}, {} bytes)", hex::encode(shown), self.0.len())
    }
}

/// The `(contract, submitter)` pair an encrypted input is bound to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncryptionContext {
    pub contract: Address,
    pub submitter: Address,
}

impl EncryptionContext {
    pub fn new(contract: Address, submitter: Address) -> Self {
        Self {
            contract,
            submitter,
        }
    }
}

/// Encrypted, attested move. Deliberately not `Clone`: each payload is
/// consumed by exactly one create or join submission.
#[derive(Debug, PartialEq, Eq)]
pub struct EncryptedMove {
    handle: CiphertextHandle,
    proof: InputProof,
    context: EncryptionContext,
}

impl EncryptedMove {
    /// Assemble a payload from backend output
    pub fn new(handle: CiphertextHandle, proof: InputProof, context: EncryptionContext) -> Self {
        Self {
            handle,
            proof,
            context,
        }
    }

    pub fn handle(&self) -> &CiphertextHandle {
        &self.handle
    }

    pub fn proof(&self) -> &InputProof {
        &self.proof
    }

    /// The pair this payload is bound to
    pub fn context(&self) -> &EncryptionContext {
        &self.context
    }
}
