//! Piecewise-linear tree representation.
//!
//! A [`Tree`] is an arena of [`Node`]s rooted at id `0`. Interior nodes are
//! MIN/MAX [`Combination`]s over an ordered list of children; leaves are
//! [`LinearUnit`]s, each an affine function of the inputs. Evaluating a tree at
//! a point returns both the value and the leaf that produced it, so training
//! code can route the sample's residual without mutating during evaluation.

/// Index of a node in a tree's arena.
pub type NodeId = u32;

mod constraints;
mod evaluate;
mod leaf;
mod node;
mod tree;

pub use constraints::{AxisConstraint, ConstraintOverrides, Constraints};
pub use evaluate::Evaluate;
pub use leaf::{LeafStats, LinearUnit};
pub use node::{Combination, Node, Operator};
pub use tree::{Evaluation, Tree};
