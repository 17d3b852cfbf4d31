//! Field element codec.
//!
//! The wire format carries every field element as a decimal string, matching
//! the protocol's transport schema. Parsing reduces the value modulo the
//! field order, so comparisons downstream always happen on canonical
//! representatives.

use ark_ff::{BigInteger256, PrimeField, Zero};

use crate::{CryptoError, Fr, Result};

/// Upper bound on accepted decimal-string length.
///
/// The field order has 77 decimal digits; anything much longer is garbage
/// input, not a field element.
const MAX_DECIMAL_LEN: usize = 128;

/// Parse a decimal wire string into a field element.
///
/// Rejects empty strings, non-digit characters and oversized inputs. Values
/// at or above the field order are reduced modulo the order.
pub fn field_from_decimal(s: &str) -> Result<Fr> {
    if s.is_empty() || s.len() > MAX_DECIMAL_LEN {
        return Err(CryptoError::MalformedField(s.to_string()));
    }

    let ten = Fr::from(10u64);
    let mut acc = Fr::zero();
    for byte in s.bytes() {
        let digit = match byte {
            b'0'..=b'9' => u64::from(byte - b'0'),
            _ => return Err(CryptoError::MalformedField(s.to_string())),
        };
        acc = acc * ten + Fr::from(digit);
    }
    Ok(acc)
}

/// Encode a field element as its canonical decimal wire string.
pub fn field_to_decimal(f: &Fr) -> String {
    f.into_bigint().to_string()
}

/// Hash arbitrary message content into the field.
///
/// `x_share = BLAKE3(content)` reduced into the scalar field. This is the
/// x-coordinate every message reveals on its sender's secret-bearing line,
/// so it must be deterministic across all parties for the engine's
/// duplicate detection to work.
pub fn signal_hash(content: &[u8]) -> Fr {
    let digest = blake3::hash(content);
    Fr::from_le_bytes_mod_order(digest.as_bytes())
}

/// Convert bytes to a BLS12-381 scalar field element.
pub fn bytes_to_field(bytes: &[u8; 32]) -> Result<Fr> {
    let mut repr = [0u64; 4];
    for (i, chunk) in bytes.chunks(8).take(4).enumerate() {
        let mut b = [0u8; 8];
        b.copy_from_slice(chunk);
        repr[i] = u64::from_le_bytes(b);
    }
    let big = BigInteger256::new(repr);
    Fr::from_bigint(big)
        .ok_or_else(|| CryptoError::InvalidInput("value exceeds field modulus".into()))
}

/// Convert a field element to bytes.
pub fn field_to_bytes(f: &Fr) -> [u8; 32] {
    let repr = f.into_bigint();
    let mut bytes = [0u8; 32];
    for (i, limb) in repr.0.iter().enumerate() {
        bytes[i * 8..(i + 1) * 8].copy_from_slice(&limb.to_le_bytes());
    }
    bytes
}
