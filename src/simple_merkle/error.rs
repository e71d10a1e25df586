/// An error that occurred while building, proving against, or checking a merkle tree.
#[derive(Debug, PartialEq, Eq, Clone, Copy, thiserror::Error)]
pub enum TreeError {
    /// A tree was requested for an empty element list. No root can be formed from zero leaves.
    #[error("cannot build a merkle tree from an empty element list")]
    EmptyInput,
    /// The requested element is not committed to by any leaf of the tree
    #[error("element not found in the tree")]
    ElementNotFound,
    /// The tree's internal structure is inconsistent. This indicates a bug in the tree
    /// maintenance logic and is never an expected runtime outcome.
    #[error("structural invariant violated: {0}")]
    StructuralInvariantViolation(&'static str),
}
