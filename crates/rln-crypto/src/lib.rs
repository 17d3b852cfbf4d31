//! # rln-crypto
//!
//! Cryptographic primitives for the RLN protocol engine.
//!
//! Everything the protocol computes lives on the BLS12-381 scalar field:
//! identity commitments, epochs, nullifiers and polynomial shares are all
//! field elements, transported as decimal strings. The cryptographic suite
//! is fixed — no algorithm negotiation is permitted.
//!
//! ## Modules
//!
//! - [`field`] — Field element codec (decimal wire strings, byte conversion, signal hashing)
//! - [`poseidon`] — Poseidon hash on BLS12-381 scalar field
//! - [`shamir`] — Two-point secret recovery on a degree-1 polynomial
//! - [`groth16`] — Groth16/BLS12-381 verification infrastructure

pub mod field;
pub mod groth16;
pub mod poseidon;
pub mod shamir;

/// The protocol field: the BLS12-381 scalar field.
pub type Fr = ark_bls12_381::Fr;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// A wire string is not a valid field element encoding.
    #[error("malformed field element: {0}")]
    MalformedField(String),

    /// Two-point recovery was attempted on a degenerate point pair.
    #[error("secret recovery requires two distinct x coordinates")]
    DegenerateShares,

    /// Groth16 proof generation or verification failed.
    #[error("proof error: {0}")]
    Proof(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
