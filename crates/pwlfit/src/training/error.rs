//! Training errors.

use thiserror::Error;

/// Errors that abort the training of one tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainError {
    /// The sample source and the tree disagree on the input count.
    #[error("sample source has {actual} inputs, tree expects {expected}")]
    InputCount { expected: usize, actual: usize },

    /// A sample contained NaN or infinity.
    #[error("sample {sample} of epoch {epoch} is not finite")]
    NonFiniteSample { epoch: usize, sample: usize },

    /// The sample source produced an empty epoch.
    #[error("sample source produced no samples")]
    EmptyEpoch,

    /// Targets or noise samples do not line up with the training rows.
    #[error("{what} has {actual} entries, expected {expected}")]
    Misaligned {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Too few rows to split in two halves.
    #[error("noise estimation needs at least 2 training rows, got {0}")]
    TooFewRows(usize),

    /// The fit was cancelled between growth iterations.
    #[error("training was cancelled")]
    Cancelled,
}

/// A training error attributed to one ensemble member.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("ensemble member {member} failed: {error}")]
pub struct MemberError {
    pub member: usize,
    #[source]
    pub error: TrainError,
}
