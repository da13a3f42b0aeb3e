//! Arena-backed MIN/MAX tree of linear units.

use super::constraints::Constraints;
use super::evaluate::{check_point, Evaluate};
use super::leaf::LinearUnit;
use super::node::{Combination, Node, Operator};
use super::NodeId;

/// Result of evaluating a tree at one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub value: f64,
    /// The leaf whose value won at every combination on the way up.
    pub leaf: NodeId,
}

/// A piecewise-linear tree under training.
///
/// The root is node `0`. Nodes are only created by [`Tree::new`] (one root
/// leaf) and by [`Tree::split`]; they are never removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
    constraints: Constraints,
    smoothing: f64,
}

impl Tree {
    /// A single-leaf tree.
    ///
    /// # Panics
    ///
    /// Panics if the root leaf and the constraints disagree on the input count,
    /// or if `smoothing` is negative.
    pub fn new(constraints: Constraints, root: LinearUnit, smoothing: f64) -> Self {
        assert_eq!(
            root.n_inputs(),
            constraints.n_inputs(),
            "root leaf and constraints disagree on the input count"
        );
        assert!(smoothing >= 0.0, "smoothing must be non-negative");
        Self {
            nodes: vec![Node::Leaf(root)],
            constraints,
            smoothing,
        }
    }

    /// Evaluate at `x` (inputs only, or a full row).
    ///
    /// # Panics
    ///
    /// Panics if `x` has the wrong length.
    pub fn evaluate(&self, x: &[f64]) -> Evaluation {
        check_point(x, self.n_inputs());
        self.evaluate_node(0, x)
    }

    fn evaluate_node(&self, id: NodeId, x: &[f64]) -> Evaluation {
        match &self.nodes[id as usize] {
            Node::Leaf(unit) => Evaluation {
                value: unit.evaluate(x),
                leaf: id,
            },
            Node::Combination(Combination { op, children }) => {
                let mut children = children.iter().map(|&child| self.evaluate_node(child, x));
                let first = children
                    .next()
                    .expect("combination nodes always have children");
                let (mut best, mut value) = (first, first.value);
                for candidate in children {
                    if op.prefers(candidate.value, best.value) {
                        best = candidate;
                    }
                    value = op.combine(value, candidate.value, self.smoothing);
                }
                Evaluation {
                    value,
                    leaf: best.leaf,
                }
            }
        }
    }

    /// Replace leaf `id` by a combination of two copies of it.
    ///
    /// The first child gets `weights + tilt`, the second `weights − tilt`,
    /// both clamped to the weight bounds. The combination takes over the
    /// leaf's slot so references to `id` stay valid; the children are appended.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a leaf or `tilt` has the wrong length.
    pub fn split(&mut self, id: NodeId, op: Operator, tilt: &[f64]) -> [NodeId; 2] {
        let parent = self.nodes[id as usize]
            .as_leaf()
            .expect("only leaves can be split")
            .reseeded();
        assert_eq!(tilt.len(), parent.n_inputs(), "tilt length mismatch");

        let make_child = |sign: f64| {
            let mut child = parent.clone();
            for ((w, t), axis) in child
                .weights_mut()
                .iter_mut()
                .zip(tilt)
                .zip(&self.constraints.axes)
            {
                *w = axis.clamp_weight(*w + sign * t);
            }
            child
        };
        let upper = make_child(1.0);
        let lower = make_child(-1.0);

        let first = self.nodes.len() as NodeId;
        let children = [first, first + 1];
        self.nodes[id as usize] = Node::Combination(Combination {
            op,
            children: children.to_vec(),
        });
        self.nodes.push(Node::Leaf(upper));
        self.nodes.push(Node::Leaf(lower));
        children
    }

    /// Clear the accounting accumulators of every leaf.
    pub fn reset_stats(&mut self) {
        for node in &mut self.nodes {
            if let Node::Leaf(unit) = node {
                unit.stats = Default::default();
            }
        }
    }

    /// Leaf ids in preorder (children in order).
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![0 as NodeId];
        while let Some(id) = stack.pop() {
            match &self.nodes[id as usize] {
                Node::Leaf(_) => leaves.push(id),
                Node::Combination(c) => stack.extend(c.children.iter().rev()),
            }
        }
        leaves
    }

    /// Maximum number of nested combinations on any root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut stack = vec![(0 as NodeId, 0usize)];
        while let Some((id, level)) = stack.pop() {
            match &self.nodes[id as usize] {
                Node::Leaf(_) => depth = depth.max(level),
                Node::Combination(c) => stack.extend(c.children.iter().map(|&child| (child, level + 1))),
            }
        }
        depth
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline]
    pub fn leaf(&self, id: NodeId) -> Option<&LinearUnit> {
        self.nodes.get(id as usize).and_then(Node::as_leaf)
    }

    #[inline]
    pub(crate) fn leaf_mut(&mut self, id: NodeId) -> Option<&mut LinearUnit> {
        self.nodes.get_mut(id as usize).and_then(Node::as_leaf_mut)
    }

    /// A leaf together with the tree's constraints, borrowed disjointly.
    #[inline]
    pub(crate) fn leaf_with_constraints_mut(&mut self, id: NodeId) -> Option<(&mut LinearUnit, &Constraints)> {
        let Self {
            nodes, constraints, ..
        } = self;
        nodes
            .get_mut(id as usize)
            .and_then(Node::as_leaf_mut)
            .map(|unit| (unit, &*constraints))
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    #[inline]
    pub fn n_inputs(&self) -> usize {
        self.constraints.n_inputs()
    }

    /// Inputs plus output.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.n_inputs() + 1
    }

    #[inline]
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    #[inline]
    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }
}

impl Evaluate for Tree {
    fn n_inputs(&self) -> usize {
        Tree::n_inputs(self)
    }

    fn predict(&self, x: &[f64]) -> f64 {
        self.evaluate(x).value
    }
}
