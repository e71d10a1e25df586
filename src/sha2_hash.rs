use sha2::{Digest, Sha256};

use crate::simple_merkle::tree::MerkleHash;

/// A plain sha256 hasher. Leaves are hashed as `sha256(data)` and inner nodes as
/// `sha256(left ++ right)`, without domain separation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sha2Hasher;

impl Sha2Hasher {
    /// Create a new instance of the hasher
    pub fn new() -> Self {
        Sha2Hasher
    }
}

impl MerkleHash for Sha2Hasher {
    type Output = [u8; 32];

    fn hash_leaf(&self, data: &[u8]) -> Self::Output {
        Sha256::digest(data).into()
    }

    fn hash_nodes(&self, left: &Self::Output, right: &Self::Output) -> Self::Output {
        let mut hasher = Sha256::new();
        hasher.update(left);
        hasher.update(right);
        hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_is_plain_sha256() {
        // sha256("hello")
        assert_eq!(
            hex::encode(Sha2Hasher.hash_leaf(b"hello")),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_hash_nodes_is_order_sensitive() {
        let hasher = Sha2Hasher::new();
        let a = hasher.hash_leaf(b"a");
        let b = hasher.hash_leaf(b"b");
        assert_ne!(hasher.hash_nodes(&a, &b), hasher.hash_nodes(&b, &a));
        assert_eq!(
            hasher.hash_nodes(&a, &b),
            <[u8; 32]>::from(Sha256::digest([a, b].concat()))
        );
    }
}
