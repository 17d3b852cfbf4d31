//! The proof-system boundary.
//!
//! Proving and verification belong to an external collaborator. The
//! engine only ever asks whether a proof binds a given set of public
//! signals, and fails closed on anything but a confident yes.

use rln_crypto::Fr;

/// Failure inside the external proof system.
///
/// The classifier treats any of these as a verification failure (the
/// message classifies as invalid); they are surfaced as a distinct type
/// so the daemon can log the backend's reason.
#[derive(Debug, thiserror::Error)]
pub enum ProofSystemError {
    /// The backend rejected the proof or key encoding.
    #[error("malformed proof material: {0}")]
    Malformed(String),

    /// The backend failed internally.
    #[error("proof backend failure: {0}")]
    Backend(String),
}

/// External SNARK verifier capability.
///
/// Implementations must be cheap to share across threads: verification
/// runs on a blocking worker while the engine state lock is free.
pub trait ProofSystem: Send + Sync + 'static {
    /// Verify `proof` against the ordered public signals.
    fn verify_proof(
        &self,
        public_signals: &[Fr],
        proof: &[u8],
    ) -> std::result::Result<bool, ProofSystemError>;
}

/// The public signals a message proof binds, in circuit order.
#[derive(Clone, Copy, Debug)]
pub struct PublicSignals {
    pub y_share: Fr,
    pub root: Fr,
    pub nullifier: Fr,
    pub x_share: Fr,
    pub epoch: Fr,
    /// Application separation tag; appended only when the deployment is
    /// multi-tenant.
    pub rln_identifier: Option<Fr>,
}

impl PublicSignals {
    /// Flatten into the ordered sequence the circuit expects:
    /// `[y_share, root, nullifier, x_share, epoch(, rln_identifier)]`.
    pub fn to_vec(&self) -> Vec<Fr> {
        let mut signals = vec![
            self.y_share,
            self.root,
            self.nullifier,
            self.x_share,
            self.epoch,
        ];
        if let Some(id) = self.rln_identifier {
            signals.push(id);
        }
        signals
    }
}
