//! Flat read-only export of a trained tree.
//!
//! [`DecisionTree`] drops every training accumulator, folds each leaf's
//! centroid into its bias and stores the nodes in preorder with contiguous
//! child ranges. It agrees with the tree it came from up to rounding (the
//! folded bias changes the order of operations) and is the form written by
//! [`crate::persist`], whose round trip is bit-exact.

mod decision_tree;
mod error;

pub use decision_tree::{DecisionLeaf, DecisionNode, DecisionTree, MAX_DEPTH};
pub use error::{ExportError, TreeValidationError};
