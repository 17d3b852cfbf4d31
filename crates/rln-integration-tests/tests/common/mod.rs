//! Shared helpers: an honest-client simulator and a proof system that
//! models the one property the engine relies on, namely that a proof
//! binds the root it was generated against.

// Not every test binary touches every helper.
#![allow(dead_code)]

use std::sync::Arc;

use rln_crypto::{field, poseidon, Fr};
use rln_engine::{ProofSystem, ProofSystemError};
use rln_types::wire::Message;

/// Proof system stub that treats the proof bytes as the prover's claimed
/// root and accepts iff it matches the root in the public signals.
///
/// This models the engine-visible behavior of the real circuit: a proof
/// generated from a stale witness fails against the advanced root.
pub struct RootBindingProofSystem;

impl ProofSystem for RootBindingProofSystem {
    fn verify_proof(
        &self,
        public_signals: &[Fr],
        proof: &[u8],
    ) -> Result<bool, ProofSystemError> {
        let root = public_signals
            .get(1)
            .ok_or_else(|| ProofSystemError::Malformed("missing root signal".into()))?;
        Ok(proof == field::field_to_bytes(root).as_slice())
    }
}

/// A member identity driving the client side of the protocol.
pub struct Sender {
    pub secret: Fr,
    /// Per-epoch blinding term; a real client derives it from the secret
    /// and epoch, the tests just fix one per sender.
    pub a1: Fr,
    /// Per-epoch nullifier tag.
    pub nullifier: Fr,
}

impl Sender {
    pub fn new(secret: u64, a1: u64, nullifier: u64) -> Self {
        Self {
            secret: Fr::from(secret),
            a1: Fr::from(a1),
            nullifier: Fr::from(nullifier),
        }
    }

    pub fn commitment(&self) -> Fr {
        poseidon::identity_commitment(self.secret)
    }

    /// Build a wire message: one point on `y = a1 * x + secret`, proved
    /// against the root the sender's current witness carries.
    pub fn message(&self, epoch: u64, content: &str, proved_root: Fr) -> Message {
        let x = field::signal_hash(content.as_bytes());
        let y = self.a1 * x + self.secret;
        Message {
            proof: field::field_to_bytes(&proved_root).to_vec(),
            nullifier: field::field_to_decimal(&self.nullifier),
            content: content.into(),
            epoch: epoch.to_string(),
            y_share: field::field_to_decimal(&y),
            rln_identifier: None,
        }
    }
}

pub fn proof_system() -> Arc<dyn ProofSystem> {
    Arc::new(RootBindingProofSystem)
}
