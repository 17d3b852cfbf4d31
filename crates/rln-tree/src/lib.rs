//! # rln-tree
//!
//! The membership tree: an append-only, fixed-depth Merkle tree over
//! identity commitments, hashed with the workspace Poseidon instance.
//!
//! Members are inserted at the next free leaf; slashing zeroes a leaf in
//! place rather than compacting the tree, so leaf indices are stable for
//! the lifetime of the set. Every mutation recomputes only the path from
//! the touched leaf to the root.
//!
//! ## Modules
//!
//! - [`tree`] — The [`MembershipTree`] itself
//! - [`witness`] — Membership witnesses and offline verification

pub mod tree;
pub mod witness;

pub use tree::MembershipTree;
pub use witness::Witness;

/// Error types for tree operations.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Every leaf slot is occupied.
    #[error("tree is full ({capacity} leaves)")]
    TreeFull {
        /// Total leaf capacity.
        capacity: usize,
    },

    /// The leaf index does not name an assigned leaf.
    #[error("leaf index {index} out of range (assigned leaves: {assigned})")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of currently assigned leaves.
        assigned: usize,
    },

    /// The requested tree shape cannot be built.
    #[error("invalid tree parameters: {0}")]
    InvalidParameters(String),
}

/// Convenience result type for tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;
