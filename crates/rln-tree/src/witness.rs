//! Membership witnesses.
//!
//! A witness proves that a leaf hashes up to a specific root. The engine
//! hands one out at registration and on demand; clients feed it to their
//! prover as the private membership path. Verification here exists for
//! tests and for clients sanity-checking a freshly fetched witness. The
//! engine itself never accepts a caller-supplied witness.

use rln_crypto::{field, poseidon, Fr};
use rln_types::wire::WitnessWire;

/// A membership proof path, ordered leaf-to-root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Witness {
    /// Root this witness was generated against.
    pub root: Fr,
    /// Sibling groups per level, `arity - 1` values each.
    pub path: Vec<Vec<Fr>>,
    /// Position of the climbing node within its group, per level.
    pub path_indices: Vec<usize>,
}

impl Witness {
    /// Encode for the wire.
    pub fn to_wire(&self) -> WitnessWire {
        WitnessWire {
            root: field::field_to_decimal(&self.root),
            path_elements: self
                .path
                .iter()
                .map(|group| group.iter().map(field::field_to_decimal).collect())
                .collect(),
            path_indices: self.path_indices.clone(),
        }
    }
}

/// Recompute the root from a leaf value and witness; true when it matches
/// the witness's own root.
pub fn verify_witness(leaf: Fr, witness: &Witness) -> bool {
    if witness.path.len() != witness.path_indices.len() {
        return false;
    }

    let mut acc = leaf;
    for (siblings, &position) in witness.path.iter().zip(&witness.path_indices) {
        if position > siblings.len() {
            return false;
        }
        let mut children = Vec::with_capacity(siblings.len() + 1);
        children.extend_from_slice(&siblings[..position]);
        children.push(acc);
        children.extend_from_slice(&siblings[position..]);
        acc = poseidon::hash_children(&children);
    }
    acc == witness.root
}
