use sha2::{Digest, Sha256};

use crate::simple_merkle::tree::MerkleHash;

const LEAF_PREFIX: &[u8] = &[0];
const INNER_PREFIX: &[u8] = &[1];

/// A sha256 hasher with RFC 6962 domain separation, compatible with the
/// [Tendermint merkle hash](https://github.com/informalsystems/tendermint-rs/blob/979456c9f33463944f97f7ea3900640e59f7ea6d/tendermint/src/merkle.rs).
///
/// Trees with a power-of-two number of elements produce the same root as an RFC 6962 tree over
/// the same leaves. Other sizes differ, since this crate pads odd levels by self-duplication.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TmSha2Hasher;

impl TmSha2Hasher {
    /// Create a new instance of the hasher
    pub fn new() -> Self {
        TmSha2Hasher
    }
}

impl MerkleHash for TmSha2Hasher {
    type Output = [u8; 32];

    fn hash_leaf(&self, data: &[u8]) -> Self::Output {
        Sha256::new_with_prefix(LEAF_PREFIX)
            .chain_update(data)
            .finalize()
            .into()
    }

    fn hash_nodes(&self, left: &Self::Output, right: &Self::Output) -> Self::Output {
        Sha256::new_with_prefix(INNER_PREFIX)
            .chain_update(left)
            .chain_update(right)
            .finalize()
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MerkleTree;

    fn rfc6962_root(leaves: &[&[u8]]) -> [u8; 32] {
        let hasher = TmSha2Hasher;
        match leaves.len() {
            1 => hasher.hash_leaf(leaves[0]),
            n => {
                let split = n.next_power_of_two() >> 1;
                hasher.hash_nodes(
                    &rfc6962_root(&leaves[..split]),
                    &rfc6962_root(&leaves[split..]),
                )
            }
        }
    }

    #[test]
    fn test_power_of_two_trees_match_rfc6962() {
        let data: Vec<[u8; 1]> = (0u8..8).map(|i| [i]).collect();
        for n in [2usize, 4, 8] {
            let leaves: Vec<&[u8]> = data[..n].iter().map(|d| d.as_slice()).collect();
            let tree: MerkleTree<TmSha2Hasher> = MerkleTree::build(&leaves).unwrap();
            assert_eq!(tree.root(), Some(&rfc6962_root(&leaves)));
        }
    }

    #[test]
    fn test_domain_separation() {
        let hasher = TmSha2Hasher::new();
        let leaf = hasher.hash_leaf(b"x");
        assert_ne!(leaf, crate::Sha2Hasher.hash_leaf(b"x"));
        assert_ne!(hasher.hash_nodes(&leaf, &leaf), hasher.hash_leaf(&[leaf, leaf].concat()));
    }
}
