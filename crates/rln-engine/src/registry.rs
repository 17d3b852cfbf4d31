//! Membership registration and banning.
//!
//! The registration manager owns the membership tree together with the
//! commitment-to-leaf mapping and the permanent ban list. All three move
//! in lockstep: a commitment occupies at most one leaf, a banned
//! commitment never re-enters the tree, and slashing zeroes the leaf in
//! the same call that records the ban.

use std::collections::{HashMap, HashSet};

use rln_crypto::Fr;
use rln_tree::{MembershipTree, Witness};
use tracing::{info, warn};

/// Outcome of an admission attempt. Both rejections are domain outcomes
/// the caller must branch on, not errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The commitment was inserted at this leaf index.
    Admitted(usize),
    /// The commitment already occupies a leaf.
    AlreadyRegistered,
    /// The commitment was slashed at some point and can never return.
    Banned,
}

/// Registration state over the membership tree.
pub struct RegistrationManager {
    tree: MembershipTree,
    /// Commitment to leaf index. Entries survive banning so a slashed
    /// commitment's history stays resolvable.
    leaf_of: HashMap<Fr, usize>,
    banned: HashSet<Fr>,
}

impl RegistrationManager {
    pub fn new(tree: MembershipTree) -> Self {
        Self {
            tree,
            leaf_of: HashMap::new(),
            banned: HashSet::new(),
        }
    }

    /// Admit a commitment into the tree.
    ///
    /// The ban check runs first: a banned commitment is rejected even
    /// though its leaf was zeroed long ago. Tree insertion and the
    /// leaf-index record are updated together; a structural failure from
    /// the tree leaves the mapping untouched.
    pub fn register(&mut self, commitment: Fr) -> rln_tree::Result<Admission> {
        if self.banned.contains(&commitment) {
            return Ok(Admission::Banned);
        }
        if self.leaf_of.contains_key(&commitment) {
            return Ok(Admission::AlreadyRegistered);
        }

        let leaf_index = self.tree.insert(commitment)?;
        self.leaf_of.insert(commitment, leaf_index);
        info!(leaf_index, "member registered");
        Ok(Admission::Admitted(leaf_index))
    }

    /// Ban a commitment: record it in the ban list and zero its leaf.
    ///
    /// A commitment with no leaf mapping is logged and skipped: the
    /// engine reaches this only from a reconstruction that should always
    /// match a registered member, so a miss signals an internal
    /// inconsistency, but it must never take the engine down.
    ///
    /// Returns the zeroed leaf index when the ban was applied.
    pub fn ban(&mut self, commitment: &Fr) -> Option<usize> {
        let Some(&leaf_index) = self.leaf_of.get(commitment) else {
            warn!("ban requested for an unknown commitment; ignoring");
            return None;
        };

        self.banned.insert(*commitment);
        let zero = self.tree.zero_value();
        if let Err(e) = self.tree.update(leaf_index, zero) {
            // Unreachable for a mapped leaf; keep the invariant loud.
            warn!(leaf_index, error = %e, "failed to zero banned leaf");
            return None;
        }
        info!(leaf_index, "member banned and leaf zeroed");
        Some(leaf_index)
    }

    /// Witness for an assigned leaf.
    pub fn witness_for(&self, leaf_index: usize) -> rln_tree::Result<Witness> {
        self.tree.generate_witness(leaf_index)
    }

    /// Current membership root.
    pub fn root(&self) -> Fr {
        self.tree.root()
    }

    /// Number of assigned leaves, zeroed ones included.
    pub fn member_count(&self) -> usize {
        self.tree.len()
    }

    /// Number of banned commitments.
    pub fn banned_count(&self) -> usize {
        self.banned.len()
    }

    /// Whether this commitment is banned.
    pub fn is_banned(&self, commitment: &Fr) -> bool {
        self.banned.contains(commitment)
    }

    /// Leaf index of a registered commitment.
    pub fn leaf_index(&self, commitment: &Fr) -> Option<usize> {
        self.leaf_of.get(commitment).copied()
    }
}
