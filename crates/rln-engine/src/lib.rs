//! # rln-engine
//!
//! The RLN protocol core: membership registration, per-epoch share
//! bookkeeping, message classification and slashing.
//!
//! The engine enforces one rule (one message per member per epoch) and
//! makes violations self-punishing: each message reveals one point on its
//! sender's secret-bearing line, so a second distinct message in the same
//! epoch hands the engine two points, the interpolated secret key, and
//! therefore the sender's identity commitment to ban.
//!
//! ## Modules
//!
//! - [`engine`] — [`ProtocolEngine`]: the serialized orchestration facade
//! - [`registry`] — Membership registration and banning over the tree
//! - [`shares`] — Per-(epoch, nullifier) share storage
//! - [`detector`] — Message parsing and classification rules
//! - [`proof`] — The external proof-system boundary
//! - [`events`] — Typed broadcast event bus

pub mod detector;
pub mod engine;
pub mod events;
pub mod proof;
pub mod registry;
pub mod shares;

pub use engine::{EngineConfig, EngineStats, ProtocolEngine, RegistrationOutcome};
pub use events::EventBus;
pub use proof::{ProofSystem, ProofSystemError, PublicSignals};

/// Error types for engine operations.
///
/// These are structural failures (caller or configuration bugs), never
/// domain outcomes: a duplicate, spam or invalid message is an `Ok`
/// classification, not an error.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Tree operation failed.
    #[error(transparent)]
    Tree(#[from] rln_tree::TreeError),

    /// Field decoding or interpolation failed.
    #[error(transparent)]
    Crypto(#[from] rln_crypto::CryptoError),
}

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
