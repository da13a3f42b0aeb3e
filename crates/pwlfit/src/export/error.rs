//! Export and structural validation errors.

use thiserror::Error;

/// Errors raised while exporting a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    /// The tree nests combinations deeper than allowed. Retry with a larger
    /// limit or a smaller tree.
    #[error("tree depth {depth} exceeds the maximum of {max_depth}")]
    DepthExceeded { depth: usize, max_depth: usize },
}

/// Structural validation errors for a [`DecisionTree`](super::DecisionTree).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeValidationError {
    #[error("tree has no nodes")]
    EmptyTree,

    #[error("node {node} has no children")]
    EmptyCombination { node: u32 },

    #[error("node {node} child range {first}..{first}+{len} exceeds {n_slots} child slots")]
    SlotsOutOfBounds {
        node: u32,
        first: u32,
        len: u32,
        n_slots: usize,
    },

    #[error("node {node} references child {child}, but the tree has {n_nodes} nodes")]
    ChildOutOfBounds { node: u32, child: u32, n_nodes: usize },

    #[error("node {node} references leaf {leaf}, but the tree has {n_leaves} leaves")]
    LeafOutOfBounds { node: u32, leaf: u32, n_leaves: usize },

    #[error("node {node} references itself")]
    SelfLoop { node: u32 },

    #[error("cycle detected at node {node}")]
    CycleDetected { node: u32 },

    #[error("node {node} is reachable by more than one path")]
    DuplicateVisit { node: u32 },

    #[error("tree depth {depth} exceeds the declared maximum of {max_depth}")]
    DepthExceeded { depth: usize, max_depth: usize },

    #[error("declared depth limit {max_depth} exceeds the supported {limit}")]
    DepthLimitTooLarge { max_depth: usize, limit: usize },

    #[error("node {node} is unreachable from the root")]
    UnreachableNode { node: u32 },

    #[error("leaf {leaf} has {actual} coefficients, expected {expected}")]
    CoefficientCount {
        leaf: u32,
        expected: usize,
        actual: usize,
    },

    #[error("leaf {leaf} output coefficient is not -1")]
    OutputCoefficient { leaf: u32 },

    #[error("leaf {leaf} holds a non-finite value")]
    NonFinite { leaf: u32 },

    #[error("smoothing must be finite and non-negative")]
    InvalidSmoothing,
}
