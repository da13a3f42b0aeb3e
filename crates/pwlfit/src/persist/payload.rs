//! Versioned payload schema.
//!
//! Only append new variants; existing variants are never changed so older
//! artifacts keep decoding.

use serde::{Deserialize, Serialize};

/// Top-level payload of an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    V1(TreePayloadV1),
}

/// A decision tree as a preorder sequence of typed node records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreePayloadV1 {
    pub n_inputs: u32,
    pub smoothing: f64,
    /// Depth limit the tree was exported with; loading rejects deeper trees.
    pub max_depth: u32,
    pub nodes: Vec<NodeRecord>,
}

/// One node. Children are indices into the record sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeRecord {
    Min { children: Vec<u32> },
    Max { children: Vec<u32> },
    /// `bias + Σ cᵢ·xᵢ − y = 0`; the last coefficient is the output's `−1`.
    Leaf { bias: f64, coefficients: Vec<f64> },
}
