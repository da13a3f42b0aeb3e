//! pwlfit: piecewise-linear MIN/MAX tree fitting.
//!
//! Fits a continuous piecewise-linear function to tabular samples by growing
//! a tree whose leaves are linear units and whose interior nodes take the
//! minimum or maximum of their children. Leaves are split only when their
//! training error is significantly larger than an estimate of the label
//! noise, and several trees may be averaged into one.
//!
//! # Key Types
//!
//! - [`Fitter`] / [`FitConfig`] - End-to-end fit pipeline and its configuration
//! - [`Tree`] - The trainable piecewise-linear tree
//! - [`DecisionTree`] - Flat read-only export, persisted by [`persist`]
//! - [`Dataset`] / [`Partition`] - Training data
//!
//! # Fitting
//!
//! Use `FitConfig::builder()` to configure, then `Fitter::new(config).fit(&dataset)`.
//! [`model::spawn_fit`] runs the same pipeline in the background. The
//! building blocks (trainer, split controller, noise estimator, ensemble)
//! live in [`training`].

// Re-export approx traits for users who want to compare predictions
pub use approx;

pub mod data;
pub mod export;
pub mod model;
pub mod persist;
pub mod repr;
pub mod testing;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// High-level fitting
pub use model::{FitConfig, FitError, FitReport, FittedModel, Fitter};

// Trees and their export
pub use export::DecisionTree;
pub use repr::{Evaluate, Operator, Tree};

// Data types
pub use data::{Dataset, DatasetError, Partition, PartitionRole};

// Shared utilities
pub use utils::{run_with_threads, Parallelism};
