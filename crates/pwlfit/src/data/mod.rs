//! In-memory dataset partitions.
//!
//! Training data arrives as row-major tables of `f64` where the last column is
//! the output. A [`Dataset`] groups the partitions by role:
//!
//! - `Train` and `Variance` rows are concatenated into the *training rows*.
//!   Noise estimation and every tree of the ensemble use those rows.
//! - `Validate` rows feed the ensemble report (RMSE, input importance).
//! - `Test` rows are only evaluated once, at the end of a fit.
//!
//! Partitions are validated on construction (rectangular, finite, at least one
//! input and one output) and are immutable afterwards, so they can be shared
//! by reference between concurrently trained trees.

mod dataset;
mod error;
mod partition;
mod stats;

pub use dataset::Dataset;
pub use error::DatasetError;
pub use partition::{Partition, PartitionRole};
pub use stats::AxisStats;
