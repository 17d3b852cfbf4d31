//! Poseidon hash on BLS12-381 scalar field.
//!
//! Poseidon is the only hash the membership tree and the identity scheme
//! ever see: tree nodes, identity commitments and the share polynomial all
//! live inside a SNARK circuit on the prover side, where an arithmetic
//! hash keeps constraint counts tractable. The parameters are fixed for
//! the lifetime of any tree built on top of this module.
//!
//! ## Parameters
//!
//! - Field: BLS12-381 scalar field
//! - Width (t): 3 (2-input Poseidon)
//! - Full rounds (R_F): 8 (4 before, 4 after partial rounds)
//! - Partial rounds (R_P): 57
//! - S-box: x^5
//! - Seed: b"Rln_Poseidon_BLS12-381_t3"

use ark_ff::{BigInteger256, Field, PrimeField, Zero};

use crate::Fr;

const WIDTH: usize = 3;
const FULL_ROUNDS: usize = 8;
const PARTIAL_ROUNDS: usize = 57;

const SEED: &[u8] = b"Rln_Poseidon_BLS12-381_t3";

/// Poseidon parameters for the fixed t=3 instance.
pub struct PoseidonParams {
    /// Round constants, (R_F + R_P) * t field elements.
    pub round_constants: Vec<Fr>,
    /// MDS matrix (t x t).
    pub mds_matrix: [[Fr; WIDTH]; WIDTH],
}

/// Generate round constants deterministically from the seed.
///
/// Each constant is `BLAKE3(seed || counter)` reduced into the field,
/// following the Grain-LFSR-style derivation of the Poseidon paper.
fn generate_round_constants() -> Vec<Fr> {
    let count = (FULL_ROUNDS + PARTIAL_ROUNDS) * WIDTH;
    let mut constants = Vec::with_capacity(count);

    for i in 0..count {
        let mut input = Vec::with_capacity(SEED.len() + 8);
        input.extend_from_slice(SEED);
        input.extend_from_slice(&(i as u64).to_le_bytes());
        let digest = blake3::hash(&input);

        let mut repr = [0u64; 4];
        for (j, chunk) in digest.as_bytes().chunks(8).take(4).enumerate() {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            repr[j] = u64::from_le_bytes(bytes);
        }
        let big = BigInteger256::new(repr);
        constants.push(Fr::from_bigint(big).unwrap_or_else(Fr::zero));
    }

    constants
}

/// Generate the MDS matrix via the Cauchy construction.
fn generate_mds_matrix() -> [[Fr; WIDTH]; WIDTH] {
    let mut matrix = [[Fr::zero(); WIDTH]; WIDTH];

    // M[i][j] = 1 / (x_i + y_j) with x_i = i + 1, y_j = t + j + 1
    for (i, row) in matrix.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            let x = Fr::from((i + 1) as u64);
            let y = Fr::from((WIDTH + j + 1) as u64);
            *cell = (x + y).inverse().unwrap_or_else(Fr::zero);
        }
    }

    matrix
}

/// Get the Poseidon parameters for this protocol instance.
pub fn default_params() -> PoseidonParams {
    PoseidonParams {
        round_constants: generate_round_constants(),
        mds_matrix: generate_mds_matrix(),
    }
}

/// Apply the S-box (x^5) to a field element.
fn sbox(x: Fr) -> Fr {
    let x2 = x * x;
    let x4 = x2 * x2;
    x4 * x
}

/// Compute the Poseidon hash of two field elements.
pub fn hash(a: Fr, b: Fr) -> Fr {
    let params = default_params();
    permutation(&params, a, b)
}

/// Poseidon sponge permutation for 2 inputs.
fn permutation(params: &PoseidonParams, a: Fr, b: Fr) -> Fr {
    let half_f = FULL_ROUNDS / 2;

    // Initial state: [0, a, b] (capacity element, then the rate elements)
    let mut state = [Fr::zero(), a, b];
    let mut rc_idx = 0;

    let full_round = |state: &mut [Fr; WIDTH], rc_idx: &mut usize| {
        for (j, s) in state.iter_mut().enumerate() {
            *s += params.round_constants[*rc_idx + j];
        }
        *rc_idx += WIDTH;
        for s in state.iter_mut() {
            *s = sbox(*s);
        }
        *state = mds_mul(&params.mds_matrix, state);
    };

    for _ in 0..half_f {
        full_round(&mut state, &mut rc_idx);
    }

    for _ in 0..PARTIAL_ROUNDS {
        for (j, s) in state.iter_mut().enumerate() {
            *s += params.round_constants[rc_idx + j];
        }
        rc_idx += WIDTH;
        // Partial S-box touches only the first element
        state[0] = sbox(state[0]);
        state = mds_mul(&params.mds_matrix, &state);
    }

    for _ in 0..half_f {
        full_round(&mut state, &mut rc_idx);
    }

    state[1]
}

/// MDS matrix-vector multiplication.
fn mds_mul(matrix: &[[Fr; WIDTH]; WIDTH], state: &[Fr; WIDTH]) -> [Fr; WIDTH] {
    let mut result = [Fr::zero(); WIDTH];
    for i in 0..WIDTH {
        for j in 0..WIDTH {
            result[i] += matrix[i][j] * state[j];
        }
    }
    result
}

/// Hash an ordered group of children into their parent node.
///
/// Children are folded pairwise left-to-right through the 2-input hash, so
/// a binary node is exactly `hash(left, right)` and wider arities chain:
/// `hash(hash(c0, c1), c2)` and so on. Callers must pass at least two
/// children; a membership tree never hashes a smaller group.
pub fn hash_children(children: &[Fr]) -> Fr {
    debug_assert!(children.len() >= 2, "a node has at least two children");
    let mut acc = hash(children[0], children[1]);
    for child in &children[2..] {
        acc = hash(acc, *child);
    }
    acc
}

/// Derive an identity commitment from a secret key.
///
/// `commitment = Poseidon(secret, 0)`. The engine recomputes this after
/// slashing-time secret recovery, so the derivation is part of the
/// protocol and must never change underneath a live membership set.
pub fn identity_commitment(secret: Fr) -> Fr {
    hash(secret, Fr::zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poseidon_deterministic() {
        let a = Fr::from(1u64);
        let b = Fr::from(2u64);
        assert_eq!(hash(a, b), hash(a, b));
    }

    #[test]
    fn test_poseidon_different_inputs() {
        let h1 = hash(Fr::from(1u64), Fr::from(2u64));
        let h2 = hash(Fr::from(3u64), Fr::from(4u64));
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_poseidon_zero_inputs() {
        let h = hash(Fr::zero(), Fr::zero());
        assert_ne!(h, Fr::zero());
    }

    #[test]
    fn test_poseidon_noncommutative() {
        let h1 = hash(Fr::from(1u64), Fr::from(2u64));
        let h2 = hash(Fr::from(2u64), Fr::from(1u64));
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_hash_children_binary_matches_hash() {
        let a = Fr::from(7u64);
        let b = Fr::from(11u64);
        assert_eq!(hash_children(&[a, b]), hash(a, b));
    }

    #[test]
    fn test_hash_children_wide_folds_left() {
        let c = [Fr::from(1u64), Fr::from(2u64), Fr::from(3u64)];
        assert_eq!(hash_children(&c), hash(hash(c[0], c[1]), c[2]));
    }

    #[test]
    fn test_identity_commitment_deterministic() {
        let sk = Fr::from(99u64);
        assert_eq!(identity_commitment(sk), identity_commitment(sk));
        assert_ne!(identity_commitment(sk), identity_commitment(Fr::from(100u64)));
    }

    #[test]
    fn test_params_shape() {
        let params = default_params();
        assert_eq!(params.round_constants.len(), (8 + 57) * 3);
    }

    #[test]
    fn test_sbox() {
        // 3^5 = 243
        assert_eq!(sbox(Fr::from(3u64)), Fr::from(243u64));
    }
}
