//! Training of piecewise-linear trees.
//!
//! ## Building blocks
//!
//! - [`AdaptiveTrainer`]: per-sample LMS updates of the active leaf
//! - [`SplitController`]: per-leaf error accounting and split decisions
//! - [`Grower`]: alternates the two until the tree stops changing
//! - [`SampleSource`]: where samples come from ([`TableSource`], [`ResampleSource`])
//!
//! ## Phases
//!
//! - [`linear_regression`]: single-leaf warm start
//! - [`NoiseEstimator`]: per-row noise variance from two overtrained trees
//! - [`Ensemble`]: bagged trees and the average tree
//!
//! Every training call takes an explicit [`TrainingContext`] carrying the
//! random stream, the [`TrainingLogger`], progress reporting and cancellation.

mod adapt;
mod context;
mod ensemble;
mod error;
mod grow;
mod logger;
mod noise;
mod source;
mod split;
mod warm_start;

pub use adapt::{AdaptParams, AdaptiveTrainer, TrainOutcome};
pub use context::{CancelToken, Phase, Progress, TrainRng, TrainingContext};
pub use ensemble::{Ensemble, EnsembleReport, InputImportance};
pub use error::{MemberError, TrainError};
pub use grow::{Grower, GrowthData, GrowthSummary};
pub use logger::{TrainingLogger, Verbosity};
pub use noise::{NoiseEstimator, NoiseParams, NoiseTable};
pub use source::{ResampleSource, SampleSource, TableSource};
pub use split::{DofTable, FLimit, GrowReport, OperatorChoice, SplitController, SplitCriterion, SplitParams};
pub use warm_start::{initial_unit, linear_regression, WarmStart};
