//! Implements a padded binary merkle tree over an in-memory node arena, with positional
//! inclusion proofs and in-place insertion and deletion.

/// Defines the node arena backing the tree.
pub(crate) mod arena;
/// Defines errors that might arise while building or querying a tree.
pub mod error;
/// Defines proofs on the tree.
pub mod proof;
/// Defines the merkle tree itself.
pub mod tree;
