//! Conversion between [`DecisionTree`] and the payload schema.

use super::native::DeserializeError;
use super::payload::{NodeRecord, TreePayloadV1};
use crate::export::{DecisionLeaf, DecisionNode, DecisionTree};
use crate::repr::Evaluate;

impl From<&DecisionTree> for TreePayloadV1 {
    fn from(tree: &DecisionTree) -> Self {
        let nodes = tree
            .nodes()
            .iter()
            .enumerate()
            .map(|(index, node)| match *node {
                DecisionNode::Min { .. } => NodeRecord::Min {
                    children: tree.children(index as u32).to_vec(),
                },
                DecisionNode::Max { .. } => NodeRecord::Max {
                    children: tree.children(index as u32).to_vec(),
                },
                DecisionNode::Leaf { leaf } => {
                    let leaf = &tree.leaves()[leaf as usize];
                    NodeRecord::Leaf {
                        bias: leaf.bias,
                        coefficients: leaf.coefficients.clone(),
                    }
                }
            })
            .collect();
        Self {
            n_inputs: tree.n_inputs() as u32,
            smoothing: tree.smoothing(),
            max_depth: tree.max_depth() as u32,
            nodes,
        }
    }
}

impl TryFrom<TreePayloadV1> for DecisionTree {
    type Error = DeserializeError;

    fn try_from(payload: TreePayloadV1) -> Result<Self, Self::Error> {
        let mut nodes = Vec::with_capacity(payload.nodes.len());
        let mut child_slots = Vec::new();
        let mut leaves = Vec::new();

        for record in payload.nodes {
            let node = match record {
                NodeRecord::Min { children } => {
                    let (first, len) = push_children(&mut child_slots, children);
                    DecisionNode::Min { first, len }
                }
                NodeRecord::Max { children } => {
                    let (first, len) = push_children(&mut child_slots, children);
                    DecisionNode::Max { first, len }
                }
                NodeRecord::Leaf { bias, coefficients } => {
                    leaves.push(DecisionLeaf { bias, coefficients });
                    DecisionNode::Leaf {
                        leaf: leaves.len() as u32 - 1,
                    }
                }
            };
            nodes.push(node);
        }

        Ok(DecisionTree::from_parts(
            nodes,
            child_slots,
            leaves,
            payload.n_inputs as usize,
            payload.smoothing,
            payload.max_depth as usize,
        )?)
    }
}

fn push_children(slots: &mut Vec<u32>, children: Vec<u32>) -> (u32, u32) {
    let first = slots.len() as u32;
    let len = children.len() as u32;
    slots.extend(children);
    (first, len)
}
