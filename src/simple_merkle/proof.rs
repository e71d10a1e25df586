use tracing::trace;

use super::tree::MerkleHash;
use crate::maybestd::vec::Vec;

/// The side on which a sibling sits relative to the node being proven.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Position {
    /// The sibling is the left operand: `parent = hash_nodes(sibling, current)`
    Left,
    /// The sibling is the right operand: `parent = hash_nodes(current, sibling)`
    Right,
}

/// One level of an inclusion proof.
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProofStep<H> {
    /// The digest of the sibling node
    pub sibling: H,
    /// Where the sibling sits relative to the node on the proven path
    pub position: Position,
}

/// A proof that an element is committed to by a merkle tree.
///
/// Steps are ordered from the leaf level up to, but excluding, the root.
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Proof<M: MerkleHash> {
    /// The siblings to be used to build the path to the root, with their positions.
    pub steps: Vec<ProofStep<M::Output>>,
}

impl<M: MerkleHash> Default for Proof<M> {
    fn default() -> Self {
        Self {
            steps: Default::default(),
        }
    }
}

impl<M> Proof<M>
where
    M: MerkleHash + Default,
{
    /// Verify that `element` is committed to by `root`
    pub fn verify(&self, root: &M::Output, element: impl AsRef<[u8]>) -> bool {
        self.verify_with_hasher(root, element, &M::default())
    }
}

impl<M> Proof<M>
where
    M: MerkleHash,
{
    /// Verify that `element` is committed to by `root`, using the provided hasher
    pub fn verify_with_hasher(
        &self,
        root: &M::Output,
        element: impl AsRef<[u8]>,
        hasher: &M,
    ) -> bool {
        let computed = self.compute_root_with_hasher(element, hasher);
        if &computed != root {
            trace!(steps = self.steps.len(), "proof does not match root");
            return false;
        }
        true
    }

    /// Folds the proof over the leaf hash of `element`, returning the implied root.
    pub fn compute_root_with_hasher(&self, element: impl AsRef<[u8]>, hasher: &M) -> M::Output {
        let leaf = hasher.hash_leaf(element.as_ref());
        self.steps
            .iter()
            .fold(leaf, |current, step| match step.position {
                Position::Right => hasher.hash_nodes(&current, &step.sibling),
                Position::Left => hasher.hash_nodes(&step.sibling, &current),
            })
    }

    /// Returns the steps of the proof, leaf level first.
    pub fn steps(&self) -> &[ProofStep<M::Output>] {
        &self.steps
    }

    /// Returns the number of steps in the proof.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the proof has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Checks an inclusion proof against a root digest. No tree instance is required.
pub fn verify_proof<M>(root: &M::Output, element: impl AsRef<[u8]>, proof: &Proof<M>) -> bool
where
    M: MerkleHash + Default,
{
    proof.verify(root, element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MerkleTree, Sha2Hasher, TmSha2Hasher};

    fn sample() -> (MerkleTree<Sha2Hasher>, [u8; 32]) {
        let tree = MerkleTree::build(["alpha", "beta", "gamma", "delta", "epsilon"]).unwrap();
        let root = *tree.root().unwrap();
        (tree, root)
    }

    #[test]
    fn test_every_flipped_byte_is_rejected() {
        let (tree, root) = sample();
        let proof = tree.prove("gamma").unwrap();
        assert!(verify_proof(&root, "gamma", &proof));

        for step in 0..proof.len() {
            for byte in 0..32 {
                let mut tampered = proof.clone();
                tampered.steps[step].sibling[byte] ^= 0x01;
                assert!(!verify_proof(&root, "gamma", &tampered));
            }
        }
    }

    #[test]
    fn test_flipped_position_is_rejected() {
        let (tree, root) = sample();
        for element in ["alpha", "beta", "gamma", "delta", "epsilon"] {
            let proof = tree.prove(element).unwrap();
            for step in 0..proof.len() {
                let mut tampered = proof.clone();
                let flipped = match tampered.steps[step].position {
                    Position::Left => Position::Right,
                    Position::Right => Position::Left,
                };
                tampered.steps[step].position = flipped;
                // Self-paired steps hash the same digest on both sides, so flipping them is a no-op.
                let self_paired = tampered.steps[step].sibling
                    == proof.compute_partial(element, step);
                assert_eq!(verify_proof(&root, element, &tampered), self_paired);
            }
        }
    }

    #[test]
    fn test_wrong_hasher_is_rejected() {
        let tree: MerkleTree<TmSha2Hasher> = MerkleTree::build(["a", "b", "c"]).unwrap();
        let root = *tree.root().unwrap();
        let proof = tree.prove("b").unwrap();
        assert!(proof.verify(&root, "b"));
        assert!(proof.verify_with_hasher(&root, "b", &TmSha2Hasher));

        let steps = proof.steps().to_vec();
        let plain: Proof<Sha2Hasher> = Proof { steps };
        assert!(!plain.verify(&root, "b"));
    }

    #[test]
    fn test_truncated_proof_is_rejected() {
        let (tree, root) = sample();
        let mut proof = tree.prove("delta").unwrap();
        proof.steps.pop();
        assert!(!verify_proof(&root, "delta", &proof));
        assert!(!verify_proof(&root, "delta", &Proof::<Sha2Hasher>::default()));
    }

    #[test]
    fn test_proofs_have_total_equality() {
        fn assert_total_eq<T: Eq>(_: &T) {}
        let (tree, _) = sample();
        let proof = tree.prove("beta").unwrap();
        assert_total_eq(&proof);
        assert_eq!(proof, tree.prove("beta").unwrap());
        assert_ne!(proof, tree.prove("alpha").unwrap());
    }

    #[test]
    fn test_proof_serde_json() {
        let (tree, root) = sample();
        let proof = tree.prove("beta").unwrap();
        let serialized = serde_json::to_vec(&proof).expect("Serialization to vec must succeed");
        let deserialized: Proof<Sha2Hasher> =
            serde_json::from_slice(&serialized[..]).expect("serialized proof is correct");
        assert_eq!(deserialized, proof);
        assert!(deserialized.verify(&root, "beta"));
    }

    #[test]
    fn test_proof_serde_postcard() {
        let (tree, _) = sample();
        let proof = tree.prove("epsilon").unwrap();
        let serialized = postcard::to_allocvec(&proof).expect("Serialization to vec must succeed");
        let deserialized: Proof<Sha2Hasher> =
            postcard::from_bytes(&serialized[..]).expect("serialized proof is correct");
        assert_eq!(deserialized, proof);
    }

    #[test]
    fn test_proof_borsh() {
        let (tree, _) = sample();
        let proof = tree.prove("alpha").unwrap();
        let serialized = borsh::to_vec(&proof).expect("Serialization to vec must succeed");
        let deserialized: Proof<Sha2Hasher> =
            borsh::from_slice(&serialized).expect("serialized proof is correct");
        assert_eq!(deserialized, proof);
    }

    impl<M: MerkleHash> Proof<M> {
        /// The digest of the node on the proven path just below step `level`.
        fn compute_partial(&self, element: &str, level: usize) -> M::Output
        where
            M: Default,
        {
            let prefix = Proof::<M> {
                steps: self.steps[..level].to_vec(),
            };
            prefix.compute_root_with_hasher(element, &M::default())
        }
    }
}
