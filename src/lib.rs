#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
//! This crate implements a padded binary merkle tree. A set of byte-string elements is
//! committed to with a single root digest, membership of any one element can be proven
//! with a short positional proof, and the tree can be updated in place with inserts and
//! deletes while the root keeps committing to the current element set.
//!
//! When a level of the tree holds an odd number of nodes, the last node is paired with
//! itself. The default hasher is a plain sha256 (`Sha2Hasher`). A domain separated,
//! RFC 6962 style hasher is available as `TmSha2Hasher`.
//!
//! ```
//! use pmt_rs::{verify_proof, MerkleTree, Sha2Hasher};
//!
//! let tree: MerkleTree<Sha2Hasher> = MerkleTree::build(&["hello", "world", "test"]).unwrap();
//! let root = tree.root().unwrap().clone();
//! let proof = tree.prove("hello").unwrap();
//! assert!(verify_proof::<Sha2Hasher>(&root, "hello", &proof));
//! assert!(!verify_proof::<Sha2Hasher>(&root, "nope", &proof));
//! ```

#[cfg(not(feature = "std"))]
extern crate alloc;

mod maybestd {
    #[cfg(not(feature = "std"))]
    pub use alloc::vec;
    #[cfg(not(feature = "std"))]
    pub use core::{fmt, hash};
    #[cfg(feature = "std")]
    pub use std::{fmt, hash, vec};
}

mod sha2_hash;
pub mod simple_merkle;
mod tendermint_hash;

pub use sha2_hash::Sha2Hasher;
pub use simple_merkle::{
    error::TreeError,
    proof::{verify_proof, Position, Proof, ProofStep},
    tree::{DeletePolicy, MerkleHash, MerkleTree, TreeConfig},
};
pub use tendermint_hash::TmSha2Hasher;
