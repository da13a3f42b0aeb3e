//! Flat decision-tree form of a trained tree.

use super::error::{ExportError, TreeValidationError};
use crate::repr::{Evaluate, Node, NodeId, Operator, Tree};

/// Deepest combination nesting a [`DecisionTree`] may declare.
///
/// Evaluation recurses once per level, so loaded trees are held to this bound.
pub const MAX_DEPTH: usize = 1024;

/// A node of a [`DecisionTree`], in preorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionNode {
    /// Children are `child_slots[first..first + len]`.
    Min { first: u32, len: u32 },
    Max { first: u32, len: u32 },
    Leaf { leaf: u32 },
}

impl DecisionNode {
    fn combination(op: Operator, first: u32, len: u32) -> Self {
        match op {
            Operator::Min => DecisionNode::Min { first, len },
            Operator::Max => DecisionNode::Max { first, len },
        }
    }
}

/// Finalized hyperplane `bias + Σ cᵢ·xᵢ − y = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionLeaf {
    pub bias: f64,
    /// One coefficient per input followed by `−1` for the output.
    pub coefficients: Vec<f64>,
}

impl DecisionLeaf {
    #[inline]
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        let inputs = &self.coefficients[..self.coefficients.len() - 1];
        self.bias + inputs.iter().zip(x).map(|(c, xi)| c * xi).sum::<f64>()
    }

    /// Input weights (all coefficients but the output one).
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.coefficients[..self.coefficients.len() - 1]
    }
}

/// Read-only, depth-bounded evaluation form of a [`Tree`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<DecisionNode>,
    child_slots: Vec<u32>,
    leaves: Vec<DecisionLeaf>,
    n_inputs: usize,
    smoothing: f64,
    max_depth: usize,
}

impl DecisionTree {
    /// Flatten `tree`.
    ///
    /// `max_depth` is capped at [`MAX_DEPTH`] and kept with the export.
    ///
    /// # Errors
    ///
    /// [`ExportError::DepthExceeded`] if combinations nest deeper than `max_depth`.
    pub fn export(tree: &Tree, max_depth: usize) -> Result<Self, ExportError> {
        let max_depth = max_depth.min(MAX_DEPTH);
        let depth = tree.depth();
        if depth > max_depth {
            return Err(ExportError::DepthExceeded { depth, max_depth });
        }
        let mut out = Self {
            nodes: Vec::with_capacity(tree.n_nodes()),
            child_slots: Vec::with_capacity(tree.n_nodes().saturating_sub(1)),
            leaves: Vec::with_capacity(tree.n_leaves()),
            n_inputs: tree.n_inputs(),
            smoothing: tree.smoothing(),
            max_depth,
        };
        out.emit(tree, 0);
        Ok(out)
    }

    fn emit(&mut self, tree: &Tree, id: NodeId) -> u32 {
        let index = self.nodes.len() as u32;
        match tree.node(id) {
            Node::Leaf(unit) => {
                let leaf = self.leaves.len() as u32;
                self.leaves.push(DecisionLeaf {
                    bias: unit.bias(),
                    coefficients: unit.coefficients(),
                });
                self.nodes.push(DecisionNode::Leaf { leaf });
            }
            Node::Combination(c) => {
                let first = self.child_slots.len();
                let len = c.children.len();
                self.nodes.push(DecisionNode::combination(c.op, first as u32, len as u32));
                self.child_slots.resize(first + len, 0);
                for (k, &child) in c.children.iter().enumerate() {
                    let slot = self.emit(tree, child);
                    self.child_slots[first + k] = slot;
                }
            }
        }
        index
    }

    /// Assemble from raw parts and validate the structure.
    ///
    /// # Errors
    ///
    /// Any [`TreeValidationError`] found by [`DecisionTree::validate`].
    pub fn from_parts(
        nodes: Vec<DecisionNode>,
        child_slots: Vec<u32>,
        leaves: Vec<DecisionLeaf>,
        n_inputs: usize,
        smoothing: f64,
        max_depth: usize,
    ) -> Result<Self, TreeValidationError> {
        let tree = Self {
            nodes,
            child_slots,
            leaves,
            n_inputs,
            smoothing,
            max_depth,
        };
        tree.validate()?;
        Ok(tree)
    }

    /// Check that every reference is in bounds, the nodes form a tree rooted
    /// at node 0 no deeper than the declared limit, and that every leaf is a
    /// well-formed hyperplane.
    pub fn validate(&self) -> Result<(), TreeValidationError> {
        let n_nodes = self.nodes.len();
        if n_nodes == 0 {
            return Err(TreeValidationError::EmptyTree);
        }
        if self.max_depth > MAX_DEPTH {
            return Err(TreeValidationError::DepthLimitTooLarge {
                max_depth: self.max_depth,
                limit: MAX_DEPTH,
            });
        }
        if !(self.smoothing.is_finite() && self.smoothing >= 0.0) {
            return Err(TreeValidationError::InvalidSmoothing);
        }

        for (leaf, l) in self.leaves.iter().enumerate() {
            let leaf = leaf as u32;
            if l.coefficients.len() != self.n_inputs + 1 {
                return Err(TreeValidationError::CoefficientCount {
                    leaf,
                    expected: self.n_inputs + 1,
                    actual: l.coefficients.len(),
                });
            }
            if l.coefficients[self.n_inputs] != -1.0 {
                return Err(TreeValidationError::OutputCoefficient { leaf });
            }
            if !l.bias.is_finite() || l.coefficients.iter().any(|c| !c.is_finite()) {
                return Err(TreeValidationError::NonFinite { leaf });
            }
        }

        // Iterative DFS with color marking.
        // 0 = unvisited, 1 = visiting, 2 = done
        let mut color = vec![0u8; n_nodes];
        let mut stack: Vec<(u32, bool, usize)> = vec![(0, false, 0)];
        while let Some((node, finished, level)) = stack.pop() {
            let node_usize = node as usize;
            if finished {
                color[node_usize] = 2;
                continue;
            }
            match color[node_usize] {
                0 => {}
                1 => return Err(TreeValidationError::CycleDetected { node }),
                _ => return Err(TreeValidationError::DuplicateVisit { node }),
            }
            color[node_usize] = 1;
            stack.push((node, true, level));

            match self.nodes[node_usize] {
                DecisionNode::Leaf { leaf } => {
                    if leaf as usize >= self.leaves.len() {
                        return Err(TreeValidationError::LeafOutOfBounds {
                            node,
                            leaf,
                            n_leaves: self.leaves.len(),
                        });
                    }
                }
                DecisionNode::Min { first, len } | DecisionNode::Max { first, len } => {
                    if len == 0 {
                        return Err(TreeValidationError::EmptyCombination { node });
                    }
                    if level >= self.max_depth {
                        return Err(TreeValidationError::DepthExceeded {
                            depth: level + 1,
                            max_depth: self.max_depth,
                        });
                    }
                    let end = first as usize + len as usize;
                    if end > self.child_slots.len() {
                        return Err(TreeValidationError::SlotsOutOfBounds {
                            node,
                            first,
                            len,
                            n_slots: self.child_slots.len(),
                        });
                    }
                    for &child in self.child_slots[first as usize..end].iter().rev() {
                        if child == node {
                            return Err(TreeValidationError::SelfLoop { node });
                        }
                        if child as usize >= n_nodes {
                            return Err(TreeValidationError::ChildOutOfBounds { node, child, n_nodes });
                        }
                        stack.push((child, false, level + 1));
                    }
                }
            }
        }

        if let Some(node) = color.iter().position(|&c| c == 0) {
            return Err(TreeValidationError::UnreachableNode { node: node as u32 });
        }
        Ok(())
    }

    /// Evaluate at `x`, returning the value and the index of the active leaf.
    ///
    /// # Panics
    ///
    /// Panics if `x` has neither `n_inputs` nor `n_inputs + 1` values.
    pub fn evaluate(&self, x: &[f64]) -> (f64, u32) {
        assert!(
            x.len() == self.n_inputs || x.len() == self.n_inputs + 1,
            "point has {} values, expected {} inputs (optionally followed by the output)",
            x.len(),
            self.n_inputs
        );
        self.evaluate_node(0, x)
    }

    fn evaluate_node(&self, node: u32, x: &[f64]) -> (f64, u32) {
        let (op, first, len) = match self.nodes[node as usize] {
            DecisionNode::Leaf { leaf } => return (self.leaves[leaf as usize].evaluate(x), leaf),
            DecisionNode::Min { first, len } => (Operator::Min, first, len),
            DecisionNode::Max { first, len } => (Operator::Max, first, len),
        };
        let children = &self.child_slots[first as usize..(first + len) as usize];
        let (mut best, mut best_leaf) = self.evaluate_node(children[0], x);
        let mut value = best;
        for &child in &children[1..] {
            let (candidate, leaf) = self.evaluate_node(child, x);
            if op.prefers(candidate, best) {
                best = candidate;
                best_leaf = leaf;
            }
            value = op.combine(value, candidate, self.smoothing);
        }
        (value, best_leaf)
    }

    /// Nesting depth of combinations (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut stack = vec![(0u32, 0usize)];
        while let Some((node, level)) = stack.pop() {
            match self.nodes[node as usize] {
                DecisionNode::Leaf { .. } => depth = depth.max(level),
                DecisionNode::Min { first, len } | DecisionNode::Max { first, len } => stack.extend(
                    self.child_slots[first as usize..(first + len) as usize]
                        .iter()
                        .map(|&child| (child, level + 1)),
                ),
            }
        }
        depth
    }

    #[inline]
    pub fn nodes(&self) -> &[DecisionNode] {
        &self.nodes
    }

    #[inline]
    pub fn child_slots(&self) -> &[u32] {
        &self.child_slots
    }

    #[inline]
    pub fn leaves(&self) -> &[DecisionLeaf] {
        &self.leaves
    }

    /// Children of a combination node, empty for a leaf.
    pub fn children(&self, node: u32) -> &[u32] {
        match self.nodes[node as usize] {
            DecisionNode::Leaf { .. } => &[],
            DecisionNode::Min { first, len } | DecisionNode::Max { first, len } => {
                &self.child_slots[first as usize..(first + len) as usize]
            }
        }
    }

    #[inline]
    pub fn n_leaves(&self) -> usize {
        self.leaves.len()
    }

    #[inline]
    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    /// Depth limit the tree was exported or loaded with.
    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Evaluate for DecisionTree {
    fn n_inputs(&self) -> usize {
        self.n_inputs
    }

    fn predict(&self, x: &[f64]) -> f64 {
        self.evaluate(x).0
    }
}
