//! Groth16-backed implementation of the engine's proof-system boundary.

use std::path::Path;

use rln_crypto::groth16::{SerializedProof, SerializedVerifyingKey};
use rln_crypto::{CryptoError, Fr};
use rln_engine::{ProofSystem, ProofSystemError};
use tracing::info;

/// Verifies message proofs against a fixed verifying key produced by the
/// RLN circuit's setup ceremony.
pub struct Groth16Verifier {
    verifying_key: SerializedVerifyingKey,
}

impl Groth16Verifier {
    /// Load the compressed verifying key from disk.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("cannot read verifying key {}: {e}", path.display()))?;
        info!(path = %path.display(), size = bytes.len(), "verifying key loaded");
        Ok(Self::from_bytes(bytes))
    }

    /// Build a verifier from raw compressed key bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            verifying_key: SerializedVerifyingKey { bytes },
        }
    }
}

impl ProofSystem for Groth16Verifier {
    fn verify_proof(
        &self,
        public_signals: &[Fr],
        proof: &[u8],
    ) -> std::result::Result<bool, ProofSystemError> {
        let proof = SerializedProof {
            bytes: proof.to_vec(),
        };
        rln_crypto::groth16::verify(&proof, &self.verifying_key, public_signals).map_err(
            |e| match e {
                CryptoError::Serialization(detail) => ProofSystemError::Malformed(detail),
                other => ProofSystemError::Backend(other.to_string()),
            },
        )
    }
}
