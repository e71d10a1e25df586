use bytes::Bytes;
use tracing::{debug, trace};

use super::arena::{Node, NodeArena, NodeId, NodeKind};
use super::error::TreeError;
use super::proof::{Position, Proof, ProofStep};
use crate::maybestd::{fmt::Debug, hash::Hash, vec::Vec};

/// A trait for hashing data into a merkle tree
pub trait MerkleHash {
    /// The output of this hasher.
    #[cfg(all(not(feature = "serde"), not(feature = "borsh")))]
    type Output: Debug + PartialEq + Eq + Clone + Default + Hash;

    /// The output of this hasher.
    #[cfg(all(feature = "serde", not(feature = "borsh")))]
    type Output: Debug
        + PartialEq
        + Eq
        + Clone
        + Default
        + Hash
        + serde::Serialize
        + serde::de::DeserializeOwned;

    /// The output of this hasher.
    #[cfg(all(not(feature = "serde"), feature = "borsh"))]
    type Output: Debug
        + PartialEq
        + Eq
        + Clone
        + Default
        + Hash
        + borsh::BorshSerialize
        + borsh::BorshDeserialize;

    /// The output of this hasher.
    #[cfg(all(feature = "serde", feature = "borsh"))]
    type Output: Debug
        + PartialEq
        + Eq
        + Clone
        + Default
        + Hash
        + serde::Serialize
        + serde::de::DeserializeOwned
        + borsh::BorshSerialize
        + borsh::BorshDeserialize;

    /// Hashes a committed element into a leaf digest.
    fn hash_leaf(&self, data: &[u8]) -> Self::Output;
    /// Combines two digests into one. The operands are ordered: `l` is the left child.
    fn hash_nodes(&self, l: &Self::Output, r: &Self::Output) -> Self::Output;
}

/// What [`MerkleTree::delete`] does with the hole left by a removed leaf.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Rebuild the tree from the remaining elements, in order. The root always equals the root
    /// of a freshly built tree over the same elements.
    #[default]
    Rebuild,
    /// Splice the leaf out in place. Its sibling is paired with itself, and a parent left without
    /// any real child is spliced out in turn. Cheaper, but the shape drifts from a fresh build.
    Placeholder,
}

/// Runtime options for a [`MerkleTree`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// How deletions restructure the tree.
    pub delete_policy: DeletePolicy,
}

impl TreeConfig {
    /// Returns a copy of this config using the given delete policy
    pub fn with_delete_policy(mut self, delete_policy: DeletePolicy) -> Self {
        self.delete_policy = delete_policy;
        self
    }
}

/// A binary merkle tree over a list of byte-string elements.
///
/// Leaves are created in element order. Whenever a level holds an odd number of nodes, the last
/// node is paired with itself, so every internal node has two (possibly identical) operands:
///
/// ```ascii
///             root
///           /      \
///         A          B
///        / \        / \
///      h(a) h(b)  h(c) [h(c)]
/// ```
///
/// The bracketed slot is not a stored node; it is the self-pairing of `h(c)`. Such slots are
/// the places [`MerkleTree::insert`] fills first.
pub struct MerkleTree<M>
where
    M: MerkleHash,
{
    arena: NodeArena<M::Output>,
    root: Option<NodeId>,
    num_leaves: usize,
    hasher: M,
    config: TreeConfig,
}

impl<M> MerkleTree<M>
where
    M: MerkleHash + Default,
{
    /// Builds a tree over `elements` with a default hasher.
    /// Fails with [`TreeError::EmptyInput`] if there are no elements.
    pub fn build<I, T>(elements: I) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        Self::build_with_hasher(elements, Default::default())
    }
}

impl<M> MerkleTree<M>
where
    M: MerkleHash,
{
    /// Builds a tree over `elements` with the given hasher
    pub fn build_with_hasher<I, T>(elements: I, hasher: M) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        Self::build_with_config(elements, hasher, TreeConfig::default())
    }

    /// Builds a tree over `elements` with the given hasher and config
    pub fn build_with_config<I, T>(
        elements: I,
        hasher: M,
        config: TreeConfig,
    ) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let elements: Vec<Bytes> = elements
            .into_iter()
            .map(|e| Bytes::copy_from_slice(e.as_ref()))
            .collect();
        if elements.is_empty() {
            return Err(TreeError::EmptyInput);
        }

        let mut tree = Self {
            arena: NodeArena::new(),
            root: None,
            num_leaves: 0,
            hasher,
            config,
        };
        tree.rebuild(elements);
        Ok(tree)
    }

    /// Returns the root digest, or `None` if every element has been deleted.
    pub fn root(&self) -> Option<&M::Output> {
        self.root.map(|id| &self.arena[id].hash)
    }

    /// Returns the number of committed elements. Padding is not counted.
    pub fn len(&self) -> usize {
        self.num_leaves
    }

    /// Returns true if the tree commits to no elements.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of edges between the root and its leftmost leaf.
    pub fn height(&self) -> usize {
        self.root.map_or(0, |id| self.height_of(id))
    }

    /// Returns the hasher used by this tree
    pub fn hasher(&self) -> &M {
        &self.hasher
    }

    /// Returns the config of this tree
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Returns true if some leaf commits to `element`.
    pub fn contains(&self, element: impl AsRef<[u8]>) -> bool {
        let target = self.hasher.hash_leaf(element.as_ref());
        self.find_leaf(&target).is_some()
    }

    /// Returns the committed elements in leaf order.
    pub fn elements(&self) -> Vec<Bytes> {
        self.leaf_ids()
            .into_iter()
            .filter_map(|id| self.arena[id].data().cloned())
            .collect()
    }

    /// Creates an inclusion proof for the first leaf (in leaf order) committing to `element`.
    pub fn prove(&self, element: impl AsRef<[u8]>) -> Result<Proof<M>, TreeError> {
        let target = self.hasher.hash_leaf(element.as_ref());
        let leaf = self
            .find_leaf(&target)
            .ok_or(TreeError::ElementNotFound)?;

        let mut steps = Vec::new();
        let mut current = leaf;
        while let Some(parent) = self.arena[current].parent {
            let (left, right) = self.arena[parent]
                .children()
                .ok_or(TreeError::StructuralInvariantViolation("parent of a node is a leaf"))?;
            let step = if left == current {
                ProofStep {
                    sibling: self.arena[right.unwrap_or(current)].hash.clone(),
                    position: Position::Right,
                }
            } else {
                ProofStep {
                    sibling: self.arena[left].hash.clone(),
                    position: Position::Left,
                }
            };
            steps.push(step);
            current = parent;
        }
        Ok(Proof { steps })
    }

    /// Adds `element` to the tree.
    ///
    /// The new leaf fills the shallowest self-paired slot, so on a freshly built tree the result
    /// is identical to building over the extended element list. A tree without such a slot is
    /// rebuilt one level deeper.
    pub fn insert(&mut self, element: impl AsRef<[u8]>) {
        let data = Bytes::copy_from_slice(element.as_ref());
        match self.find_open_slot() {
            Some((parent, height)) => {
                debug!(
                    slot = parent.index(),
                    height, "inserting into self-paired slot"
                );
                let subtree = self.grow_chain(data, height);
                self.arena[subtree].parent = Some(parent);
                if let NodeKind::Inner { right, .. } = &mut self.arena[parent].kind {
                    *right = Some(subtree);
                }
                self.num_leaves += 1;
                self.rehash_from(Some(parent));
            }
            None => {
                debug!(leaves = self.num_leaves, "no open slot, rebuilding for insert");
                let mut elements = self.elements();
                elements.push(data);
                self.rebuild(elements);
            }
        }
        debug_assert_eq!(self.check_invariants(), Ok(()));
    }

    /// Removes the first leaf (in leaf order) committing to `element`.
    /// Returns false, leaving the tree untouched, if there is no such leaf.
    pub fn delete(&mut self, element: impl AsRef<[u8]>) -> bool {
        let target = self.hasher.hash_leaf(element.as_ref());
        let Some(leaf) = self.find_leaf(&target) else {
            debug!("element to delete not found");
            return false;
        };

        match self.config.delete_policy {
            DeletePolicy::Rebuild => {
                let remaining = self
                    .leaf_ids()
                    .into_iter()
                    .filter(|id| *id != leaf)
                    .filter_map(|id| self.arena[id].data().cloned())
                    .collect();
                debug!(leaf = leaf.index(), "rebuilding after delete");
                self.rebuild(remaining);
            }
            DeletePolicy::Placeholder => {
                debug!(leaf = leaf.index(), "splicing out deleted leaf");
                let from = self.splice_out(leaf);
                self.num_leaves -= 1;
                self.rehash_from(from);
            }
        }
        debug_assert_eq!(self.check_invariants(), Ok(()));
        true
    }

    /// Walks the whole tree and checks that parent links, child counts and digests are
    /// consistent. A failure here is always a bug in the maintenance logic.
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        let Some(root) = self.root else {
            if self.arena.len() != 0 || self.num_leaves != 0 {
                return Err(TreeError::StructuralInvariantViolation(
                    "empty tree still owns nodes",
                ));
            }
            return Ok(());
        };
        let root_node = self
            .arena
            .get(root)
            .ok_or(TreeError::StructuralInvariantViolation("root is vacant"))?;
        if root_node.parent.is_some() {
            return Err(TreeError::StructuralInvariantViolation("root has a parent"));
        }
        if root_node.children().is_none() {
            return Err(TreeError::StructuralInvariantViolation("root is a leaf"));
        }

        let mut visited = 0;
        let mut leaves = 0;
        let mut stack = Vec::from([root]);
        while let Some(id) = stack.pop() {
            let node = self
                .arena
                .get(id)
                .ok_or(TreeError::StructuralInvariantViolation("child is vacant"))?;
            visited += 1;
            let Some((left, right)) = node.children() else {
                leaves += 1;
                continue;
            };
            if right == Some(left) {
                return Err(TreeError::StructuralInvariantViolation(
                    "node stores the same child twice",
                ));
            }
            for child in core::iter::once(left).chain(right) {
                let child_node = self
                    .arena
                    .get(child)
                    .ok_or(TreeError::StructuralInvariantViolation("child is vacant"))?;
                if child_node.parent != Some(id) {
                    return Err(TreeError::StructuralInvariantViolation(
                        "child does not point back to its parent",
                    ));
                }
                stack.push(child);
            }
            if node.hash != self.pair_hash(left, right) {
                return Err(TreeError::StructuralInvariantViolation(
                    "digest does not match children",
                ));
            }
        }

        if visited != self.arena.len() {
            return Err(TreeError::StructuralInvariantViolation(
                "arena holds unreachable nodes",
            ));
        }
        if leaves != self.num_leaves {
            return Err(TreeError::StructuralInvariantViolation("leaf count drifted"));
        }
        Ok(())
    }

    /// Replaces the whole tree with one built over `elements`. An empty list empties the tree.
    fn rebuild(&mut self, elements: Vec<Bytes>) {
        self.arena.clear();
        self.root = None;
        self.num_leaves = elements.len();
        if elements.is_empty() {
            debug!("tree is now empty");
            return;
        }

        let mut level = Vec::with_capacity(elements.len());
        for data in elements {
            let hash = self.hasher.hash_leaf(&data);
            level.push(self.arena.alloc(Node::leaf(data, hash)));
        }

        // Pair at least once, so a single element still sits under an internal root.
        loop {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            for pair in level.chunks(2) {
                next.push(self.join(pair[0], pair.get(1).copied()));
            }
            trace!(width = next.len(), "built tree level");
            level = next;
            if level.len() == 1 {
                break;
            }
        }
        self.root = level.pop();
        debug!(
            leaves = self.num_leaves,
            height = self.height(),
            "built merkle tree"
        );
    }

    /// Allocates a parent over `left` and `right`, where a missing `right` pairs `left` with itself.
    fn join(&mut self, left: NodeId, right: Option<NodeId>) -> NodeId {
        let hash = self.pair_hash(left, right);
        let parent = self.arena.alloc(Node::inner(hash, left, right));
        for child in core::iter::once(left).chain(right) {
            self.arena[child].parent = Some(parent);
        }
        parent
    }

    fn pair_hash(&self, left: NodeId, right: Option<NodeId>) -> M::Output {
        let left = &self.arena[left].hash;
        let right = right.map_or(left, |id| &self.arena[id].hash);
        self.hasher.hash_nodes(left, right)
    }

    /// Recomputes the digest of `from` and of every ancestor up to the root.
    fn rehash_from(&mut self, from: Option<NodeId>) {
        let mut current = from;
        while let Some(id) = current {
            if let Some((left, right)) = self.arena[id].children() {
                let hash = self.pair_hash(left, right);
                self.arena[id].hash = hash;
            }
            trace!(node = id.index(), "recomputed digest");
            current = self.arena[id].parent;
        }
    }

    /// Builds a subtree of the given height whose leftmost leaf holds `data`, with every
    /// internal node self-paired.
    fn grow_chain(&mut self, data: Bytes, height: usize) -> NodeId {
        let hash = self.hasher.hash_leaf(&data);
        let mut top = self.arena.alloc(Node::leaf(data, hash));
        for _ in 0..height {
            top = self.join(top, None);
        }
        top
    }

    /// Finds the self-paired node whose left child is shallowest, along with that child's height.
    fn find_open_slot(&self) -> Option<(NodeId, usize)> {
        let mut best: Option<(NodeId, usize)> = None;
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let Some((left, right)) = self.arena[id].children() else {
                continue;
            };
            match right {
                Some(right) => stack.push(right),
                None => {
                    let height = self.height_of(left);
                    if best.map_or(true, |(_, h)| height < h) {
                        best = Some((id, height));
                    }
                }
            }
            stack.push(left);
        }
        best
    }

    fn height_of(&self, id: NodeId) -> usize {
        let mut height = 0;
        let mut current = id;
        while let Some((left, _)) = self.arena[current].children() {
            height += 1;
            current = left;
        }
        height
    }

    /// Returns the first leaf in leaf order whose digest is `target`.
    fn find_leaf(&self, target: &M::Output) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = &self.arena[id];
            match node.children() {
                None if &node.hash == target => return Some(id),
                None => {}
                Some((left, right)) => {
                    stack.extend(right);
                    stack.push(left);
                }
            }
        }
        None
    }

    fn leaf_ids(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.num_leaves);
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            match self.arena[id].children() {
                None => out.push(id),
                Some((left, right)) => {
                    stack.extend(right);
                    stack.push(left);
                }
            }
        }
        out
    }

    /// Removes `id` from its parent without leaving a one-child node behind. Returns the
    /// deepest node whose digest is now stale.
    fn splice_out(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.arena.remove(id).and_then(|node| node.parent);
        let Some(parent) = parent else {
            self.root = None;
            return None;
        };

        match self.arena[parent].children() {
            Some((left, Some(right))) => {
                let survivor = if left == id { right } else { left };
                self.arena[parent].kind = NodeKind::Inner {
                    left: survivor,
                    right: None,
                };
                Some(parent)
            }
            // The parent was only pairing `id` with itself; nothing real remains below it.
            Some((_, None)) => self.splice_out(parent),
            None => unreachable!("a leaf cannot be a parent"),
        }
    }
}
