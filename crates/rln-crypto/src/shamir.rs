//! Two-point secret recovery on a degree-1 polynomial.
//!
//! Every message reveals one point `(x, y)` on its sender's line
//! `y = a1 * x + secret` over the scalar field. One point reveals nothing;
//! two distinct points from the same epoch pin the line down completely,
//! and the secret is its value at `x = 0`. This is the algebra that makes
//! rate-limit violations self-punishing.

use ark_ff::Field;

use crate::{CryptoError, Fr, Result};

/// Recover the secret from two points on the same degree-1 polynomial.
///
/// Standard two-point Lagrange interpolation evaluated at `x = 0`:
///
/// `secret = y1 - x1 * (y2 - y1) / (x2 - x1)`
///
/// Fails with [`CryptoError::DegenerateShares`] when `x1 == x2`; callers
/// are expected to have ruled the pair out as a duplicate before asking
/// for recovery, so a degenerate pair signals a classification bug.
pub fn recover_secret(x1: Fr, y1: Fr, x2: Fr, y2: Fr) -> Result<Fr> {
    let dx = x2 - x1;
    let slope = (y2 - y1) * dx.inverse().ok_or(CryptoError::DegenerateShares)?;
    Ok(y1 - slope * x1)
}
