use core::ops::{Index, IndexMut};

use bytes::Bytes;

use crate::maybestd::vec::Vec;

/// The index of a node inside a [`NodeArena`].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The raw slot index, for logging.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The structural part of a node.
#[derive(PartialEq, Clone, Debug)]
pub enum NodeKind {
    /// A leaf, holding the committed element.
    Leaf(Bytes),
    /// An internal node. A `right` of `None` means the left child is paired with itself.
    Inner {
        /// The left child.
        left: NodeId,
        /// The right child, if the node is not self-paired.
        right: Option<NodeId>,
    },
}

#[derive(PartialEq, Clone, Debug)]
pub struct Node<H> {
    pub hash: H,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl<H> Node<H> {
    pub fn leaf(data: Bytes, hash: H) -> Self {
        Self {
            hash,
            parent: None,
            kind: NodeKind::Leaf(data),
        }
    }

    pub fn inner(hash: H, left: NodeId, right: Option<NodeId>) -> Self {
        Self {
            hash,
            parent: None,
            kind: NodeKind::Inner { left, right },
        }
    }

    /// Returns the children of an internal node, or `None` for a leaf.
    pub fn children(&self) -> Option<(NodeId, Option<NodeId>)> {
        match self.kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Inner { left, right } => Some((left, right)),
        }
    }

    pub fn data(&self) -> Option<&Bytes> {
        match &self.kind {
            NodeKind::Leaf(data) => Some(data),
            NodeKind::Inner { .. } => None,
        }
    }
}

/// Slot storage for the nodes of a single tree. Vacated slots are recycled.
#[derive(Debug, Clone)]
pub struct NodeArena<H> {
    slots: Vec<Option<Node<H>>>,
    free: Vec<NodeId>,
}

impl<H> Default for NodeArena<H> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<H> NodeArena<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: Node<H>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id.0] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<H>> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Node<H>> {
        let node = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id);
        Some(node)
    }

    /// Drops every node, invalidating all outstanding ids.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    /// The number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

impl<H> Index<NodeId> for NodeArena<H> {
    type Output = Node<H>;

    fn index(&self, id: NodeId) -> &Self::Output {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale node id {}", id.0),
        }
    }
}

impl<H> IndexMut<NodeId> for NodeArena<H> {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        match self.slots.get_mut(id.0).and_then(Option::as_mut) {
            Some(node) => node,
            None => panic!("stale node id {}", id.0),
        }
    }
}
