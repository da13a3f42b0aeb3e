//! Fit configuration with builder pattern.
//!
//! [`FitConfig`] gathers every knob of the fit pipeline. It groups the
//! per-phase learning schedules in [`PhaseParams`] and uses the `bon` crate
//! for the builder, validating everything in `build()`.
//!
//! # Example
//!
//! ```
//! use pwlfit::model::{FitConfig, PhaseParams};
//! use pwlfit::training::FLimit;
//!
//! // All defaults
//! let config = FitConfig::builder().build().unwrap();
//! assert_eq!(config.n_trees, 3);
//!
//! // A single tree with a fixed F-test limit
//! let config = FitConfig::builder()
//!     .n_trees(1)
//!     .train_average(false)
//!     .f_limit(FLimit::Fixed(2.0))
//!     .approximation(PhaseParams { max_iterations: 10, ..PhaseParams::approximation() })
//!     .build()
//!     .unwrap();
//! assert_eq!(config.f_limit, FLimit::Fixed(2.0));
//! ```

use bon::Builder;
use thiserror::Error;

use crate::export::MAX_DEPTH;
use crate::repr::ConstraintOverrides;
use crate::training::{AdaptParams, FLimit, OperatorChoice, Verbosity};

// =============================================================================
// ConfigError
// =============================================================================

/// Errors found while validating a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{phase} learning rate must be in (0, 1], got {value}")]
    InvalidLearningRate { phase: &'static str, value: f64 },

    #[error("{phase} needs at least one epoch per round")]
    InvalidEpochs { phase: &'static str },

    #[error("{phase} needs at least one iteration")]
    InvalidIterations { phase: &'static str },

    #[error("n_trees must be at least 1")]
    InvalidNTrees,

    #[error("f_limit must be positive and finite, got {0}")]
    InvalidFLimit(f64),

    #[error("degrees-of-freedom table must be non-empty with positive finite entries")]
    InvalidDofTable,

    #[error("smoothing must be non-negative and finite, got {0}")]
    InvalidSmoothing(f64),

    #[error("min_rmse must be non-negative and finite, got {0}")]
    InvalidMinRmse(f64),

    #[error("overtrain_ratio must be positive and finite, got {0}")]
    InvalidOvertrainRatio(f64),

    #[error("max_depth must be at most {limit}, got {value}")]
    InvalidMaxDepth { value: usize, limit: usize },

    #[error("tolerance of axis {axis} must be positive and finite, got {value}")]
    InvalidTolerance { axis: usize, value: f64 },

    #[error("weight bounds of axis {axis} are empty: [{min}, {max}]")]
    InvalidWeightBounds { axis: usize, min: f64, max: f64 },
}

// =============================================================================
// PhaseParams
// =============================================================================

/// Learning schedule of one training phase.
///
/// A phase runs up to `max_iterations` growth iterations, each of which
/// trains for up to `epochs_per_round` passes over the samples followed by
/// `anneal_epochs` passes at a shrinking rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseParams {
    pub learning_rate: f64,
    pub epochs_per_round: usize,
    pub anneal_epochs: usize,
    pub max_iterations: usize,
}

impl PhaseParams {
    /// Warm start. Its rounds are run back to back on a single leaf.
    pub fn linear() -> Self {
        Self {
            learning_rate: 0.15,
            epochs_per_round: 15,
            anneal_epochs: 50,
            max_iterations: 100,
        }
    }

    /// Overtraining of the two noise-estimation trees.
    pub fn overtrain() -> Self {
        Self {
            learning_rate: 0.2,
            epochs_per_round: 5,
            anneal_epochs: 0,
            max_iterations: 120,
        }
    }

    /// Ensemble members.
    pub fn approximation() -> Self {
        Self {
            learning_rate: 0.15,
            epochs_per_round: 20,
            anneal_epochs: 10,
            max_iterations: 40,
        }
    }

    /// The tree fitted to the ensemble mean.
    pub fn average() -> Self {
        Self {
            learning_rate: 0.2,
            epochs_per_round: 10,
            anneal_epochs: 5,
            max_iterations: 20,
        }
    }

    /// Trainer parameters for one round of this phase.
    pub fn adapt_params(&self, min_rmse: f64, jitter: bool) -> AdaptParams {
        AdaptParams {
            learning_rate: self.learning_rate,
            epochs: self.epochs_per_round,
            anneal_epochs: self.anneal_epochs,
            min_rmse,
            jitter,
        }
    }

    fn validate(&self, phase: &'static str) -> Result<(), ConfigError> {
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ConfigError::InvalidLearningRate {
                phase,
                value: self.learning_rate,
            });
        }
        if self.epochs_per_round == 0 {
            return Err(ConfigError::InvalidEpochs { phase });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidIterations { phase });
        }
        Ok(())
    }
}

// =============================================================================
// FitConfig
// =============================================================================

/// Configuration of the whole fit pipeline.
///
/// # Structure
///
/// - **Phases**: learning schedules for the warm start, noise estimation,
///   ensemble members and the average tree
/// - **Growth**: F-test limit, operator choice, overtraining limit
/// - **Ensemble**: member count and whether to fit the average tree
/// - **Constraints**: optional per-axis tolerance and weight-bound overrides
/// - **Resources**: threads, seed and verbosity
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct FitConfig {
    // === Phases ===
    #[builder(default = PhaseParams::linear())]
    pub linear: PhaseParams,

    #[builder(default = PhaseParams::overtrain())]
    pub overtrain: PhaseParams,

    #[builder(default = PhaseParams::approximation())]
    pub approximation: PhaseParams,

    #[builder(default = PhaseParams::average())]
    pub average: PhaseParams,

    // === Growth ===
    /// F-test limit for splitting. Default: looked up by dimension.
    #[builder(default)]
    pub f_limit: FLimit,

    /// Operator of new combinations. Default: chosen by curvature.
    #[builder(default)]
    pub operator: OperatorChoice,

    /// Noise-estimation trees split while a leaf's MSE exceeds this fraction
    /// of the output variance. Default: 0.001.
    #[builder(default = 1e-3)]
    pub overtrain_ratio: f64,

    /// Jitter training inputs within their tolerance. Default: false.
    #[builder(default = false)]
    pub jitter: bool,

    // === Ensemble ===
    /// Number of ensemble members. Default: 3.
    #[builder(default = 3)]
    pub n_trees: usize,

    /// Fit one tree to the ensemble mean. Default: true.
    #[builder(default = true)]
    pub train_average: bool,

    // === Constraints ===
    /// Per-axis tolerances; derived from the sample spacing when unset.
    pub tolerances: Option<Vec<f64>>,

    /// Per-axis `(min, max)` weight bounds.
    pub weight_bounds: Option<Vec<(f64, f64)>>,

    /// MIN/MAX fillet width; 0 gives exact MIN/MAX. Default: 0.
    #[builder(default = 0.0)]
    pub smoothing: f64,

    /// Stop a training round once its RMSE drops below this. Default: 0.
    #[builder(default = 0.0)]
    pub min_rmse: f64,

    /// Maximum combination nesting accepted by [`FittedModel::export`](super::FittedModel::export).
    /// Default: 30.
    #[builder(default = 30)]
    pub max_depth: usize,

    // === Resources ===
    /// Random seed. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    /// Thread count: 0 = auto, 1 = sequential, >1 = exact count. Default: 0.
    #[builder(default = 0)]
    pub n_threads: usize,

    /// Verbosity level. Default: `Silent`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self::builder().__build_internal()
    }
}

/// Custom finishing function that validates the config.
impl<S: fit_config_builder::IsComplete> FitConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is out of range.
    pub fn build(self) -> Result<FitConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl FitConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.linear.validate("linear regression")?;
        self.overtrain.validate("noise estimation")?;
        self.approximation.validate("approximation")?;
        self.average.validate("average tree")?;

        if self.n_trees == 0 {
            return Err(ConfigError::InvalidNTrees);
        }
        if let FLimit::Fixed(limit) = self.f_limit {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(ConfigError::InvalidFLimit(limit));
            }
        }
        if !(self.overtrain_ratio.is_finite() && self.overtrain_ratio > 0.0) {
            return Err(ConfigError::InvalidOvertrainRatio(self.overtrain_ratio));
        }
        if !(self.smoothing.is_finite() && self.smoothing >= 0.0) {
            return Err(ConfigError::InvalidSmoothing(self.smoothing));
        }
        if !(self.min_rmse.is_finite() && self.min_rmse >= 0.0) {
            return Err(ConfigError::InvalidMinRmse(self.min_rmse));
        }
        if self.max_depth > MAX_DEPTH {
            return Err(ConfigError::InvalidMaxDepth {
                value: self.max_depth,
                limit: MAX_DEPTH,
            });
        }

        for (axis, &value) in self.tolerances.iter().flatten().enumerate() {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidTolerance { axis, value });
            }
        }
        for (axis, &(min, max)) in self.weight_bounds.iter().flatten().enumerate() {
            // NaN bounds fail the comparison too.
            if !(min <= max) {
                return Err(ConfigError::InvalidWeightBounds { axis, min, max });
            }
        }
        Ok(())
    }

    /// Overrides passed to constraint derivation.
    pub fn constraint_overrides(&self) -> ConstraintOverrides {
        ConstraintOverrides {
            tolerances: self.tolerances.clone(),
            weight_bounds: self.weight_bounds.clone(),
        }
    }
}
