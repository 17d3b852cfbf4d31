//! Incremental fixed-depth Merkle tree.

use ark_ff::Zero;
use rln_crypto::{poseidon, Fr};
use tracing::debug;

use crate::witness::Witness;
use crate::{Result, TreeError};

/// Append-only membership tree of fixed depth and branching factor.
///
/// Capacity is `arity^depth` leaves. Unoccupied subtrees are represented
/// by a precomputed zero cascade instead of materialized nodes, so memory
/// grows with membership, not capacity.
pub struct MembershipTree {
    depth: usize,
    arity: usize,
    capacity: usize,
    next_index: usize,
    /// `zeros[l]` is the hash of an all-zero subtree of height `l`.
    zeros: Vec<Fr>,
    /// `levels[0]` holds the leaves, `levels[depth]` the root. Each level
    /// only materializes the occupied prefix.
    levels: Vec<Vec<Fr>>,
}

impl MembershipTree {
    /// Create an empty tree.
    ///
    /// `depth` must be at least 1 and `arity` at least 2; the resulting
    /// capacity must fit in `usize`.
    pub fn new(depth: usize, arity: usize) -> Result<Self> {
        if depth == 0 {
            return Err(TreeError::InvalidParameters("depth must be at least 1".into()));
        }
        if arity < 2 {
            return Err(TreeError::InvalidParameters("arity must be at least 2".into()));
        }
        let capacity = arity
            .checked_pow(depth as u32)
            .ok_or_else(|| TreeError::InvalidParameters(format!("{arity}^{depth} overflows")))?;

        let mut zeros = Vec::with_capacity(depth + 1);
        zeros.push(Fr::zero());
        for level in 0..depth {
            let children = vec![zeros[level]; arity];
            zeros.push(poseidon::hash_children(&children));
        }

        Ok(Self {
            depth,
            arity,
            capacity,
            next_index: 0,
            zeros,
            levels: vec![Vec::new(); depth + 1],
        })
    }

    /// The zero sentinel stored in a slashed member's leaf.
    pub fn zero_value(&self) -> Fr {
        self.zeros[0]
    }

    /// Current root.
    pub fn root(&self) -> Fr {
        self.node(self.depth, 0)
    }

    /// Number of assigned leaves (including zeroed ones).
    pub fn len(&self) -> usize {
        self.next_index
    }

    /// Whether no leaf has ever been assigned.
    pub fn is_empty(&self) -> bool {
        self.next_index == 0
    }

    /// Total leaf capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a value at the next unused leaf and return its index.
    pub fn insert(&mut self, value: Fr) -> Result<usize> {
        if self.next_index >= self.capacity {
            return Err(TreeError::TreeFull {
                capacity: self.capacity,
            });
        }
        let index = self.next_index;
        self.next_index += 1;
        self.set_node(0, index, value);
        self.recompute_path(index);
        debug!(leaf_index = index, "leaf inserted");
        Ok(index)
    }

    /// Overwrite an assigned leaf in place.
    ///
    /// Only assigned leaves can be updated; the engine uses this to zero
    /// out a slashed member without disturbing its neighbors' indices.
    pub fn update(&mut self, index: usize, value: Fr) -> Result<()> {
        if index >= self.next_index {
            return Err(TreeError::IndexOutOfRange {
                index,
                assigned: self.next_index,
            });
        }
        self.set_node(0, index, value);
        self.recompute_path(index);
        debug!(leaf_index = index, "leaf updated");
        Ok(())
    }

    /// Current value of an assigned leaf.
    pub fn leaf(&self, index: usize) -> Result<Fr> {
        if index >= self.next_index {
            return Err(TreeError::IndexOutOfRange {
                index,
                assigned: self.next_index,
            });
        }
        Ok(self.node(0, index))
    }

    /// Build the membership witness for an assigned leaf.
    ///
    /// The witness carries the root it was generated against; a witness
    /// generated before a later mutation recomputes to a stale root and
    /// must be refreshed by the holder, never patched up by the tree.
    pub fn generate_witness(&self, index: usize) -> Result<Witness> {
        if index >= self.next_index {
            return Err(TreeError::IndexOutOfRange {
                index,
                assigned: self.next_index,
            });
        }

        let mut path = Vec::with_capacity(self.depth);
        let mut path_indices = Vec::with_capacity(self.depth);
        let mut idx = index;

        for level in 0..self.depth {
            let position = idx % self.arity;
            let group_start = idx - position;
            let siblings: Vec<Fr> = (group_start..group_start + self.arity)
                .filter(|&i| i != idx)
                .map(|i| self.node(level, i))
                .collect();
            path.push(siblings);
            path_indices.push(position);
            idx /= self.arity;
        }

        Ok(Witness {
            root: self.root(),
            path,
            path_indices,
        })
    }

    /// Fetch a node, falling back to the zero cascade for unoccupied slots.
    fn node(&self, level: usize, index: usize) -> Fr {
        self.levels[level]
            .get(index)
            .copied()
            .unwrap_or(self.zeros[level])
    }

    /// Store a node, materializing the occupied prefix as needed.
    fn set_node(&mut self, level: usize, index: usize, value: Fr) {
        let zero = self.zeros[level];
        let nodes = &mut self.levels[level];
        while nodes.len() <= index {
            nodes.push(zero);
        }
        nodes[index] = value;
    }

    /// Rehash the path from a leaf up to the root.
    fn recompute_path(&mut self, leaf_index: usize) {
        let mut idx = leaf_index;
        for level in 0..self.depth {
            let group_start = (idx / self.arity) * self.arity;
            let children: Vec<Fr> = (group_start..group_start + self.arity)
                .map(|i| self.node(level, i))
                .collect();
            idx /= self.arity;
            self.set_node(level + 1, idx, poseidon::hash_children(&children));
        }
    }
}
