//! Dataset validation errors.

use thiserror::Error;

use super::PartitionRole;

/// Errors raised while building partitions or deriving per-axis statistics.
///
/// All of these are fatal configuration errors: they are surfaced before any
/// training starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    /// A partition has no rows.
    #[error("{role} partition has no rows")]
    Empty { role: PartitionRole },

    /// Rows need at least one input column and one output column.
    #[error("dimension must be at least 2 (one input, one output), got {0}")]
    DimensionTooSmall(usize),

    /// A row has a different width than the first row.
    #[error("row {row} has {actual} columns, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A value is NaN or infinite.
    #[error("non-finite value at row {row}, column {column}")]
    NonFinite { row: usize, column: usize },

    /// Two partitions of one dataset disagree on the dimension.
    #[error("{role} partition has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        role: PartitionRole,
        expected: usize,
        actual: usize,
    },

    /// An input axis has zero tolerance or zero spread.
    #[error("input axis {axis} is degenerate (constant or zero tolerance); try removing it")]
    DegenerateAxis { axis: usize },

    /// The output column is (nearly) constant.
    #[error("output standard deviation is near zero ({stdev:e})")]
    ConstantOutput { stdev: f64 },

    /// User weight bounds do not overlap the derived ones.
    #[error("weight bounds for axis {axis} are empty after intersecting with the derived bounds")]
    EmptyWeightBounds { axis: usize },

    /// A per-axis override has the wrong length.
    #[error("{field} has {actual} entries, expected one per input axis ({expected})")]
    OverrideLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}
