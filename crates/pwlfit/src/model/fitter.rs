//! The fit pipeline.
//!
//! [`Fitter::fit`] runs, in order: constraint derivation, the linear warm
//! start, noise estimation, the ensemble and (optionally) the average tree.
//! The result is a [`FittedModel`] with a [`FitReport`].

use std::sync::mpsc::Sender;

use thiserror::Error;

use super::config::{ConfigError, FitConfig};
use crate::data::{Dataset, DatasetError, PartitionRole};
use crate::export::{DecisionTree, ExportError};
use crate::repr::{Constraints, Evaluate, Tree};
use crate::training::{
    linear_regression, AdaptParams, AdaptiveTrainer, CancelToken, Ensemble, Grower, InputImportance, MemberError,
    NoiseEstimator, NoiseParams, Phase, Progress, SplitController, SplitCriterion, SplitParams, TrainError,
    TrainingContext, TrainingLogger,
};
use crate::utils::{run_with_threads, Parallelism};

// =============================================================================
// FitError
// =============================================================================

/// Errors that end a fit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Export(#[from] ExportError),

    /// Training of one tree failed.
    #[error("{phase} failed{}: {source}", member_suffix(.member))]
    Train {
        phase: Phase,
        member: Option<usize>,
        #[source]
        source: TrainError,
    },

    #[error("fit was cancelled")]
    Cancelled,

    /// A background fit ended without delivering a result.
    #[error("background fit stopped without a result")]
    WorkerLost,
}

fn member_suffix(member: &Option<usize>) -> String {
    member.map(|m| format!(" for member {m}")).unwrap_or_default()
}

impl FitError {
    fn train(phase: Phase, member: Option<usize>, source: TrainError) -> Self {
        match source {
            TrainError::Cancelled => FitError::Cancelled,
            source => FitError::Train { phase, member, source },
        }
    }
}

impl From<MemberError> for FitError {
    fn from(err: MemberError) -> Self {
        FitError::train(Phase::Approximation, Some(err.member), err.error)
    }
}

// =============================================================================
// Report
// =============================================================================

/// Outcome of one ensemble member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberReport {
    /// RMSE on the report rows.
    pub rmse: f64,
    /// RMSE against the training rows after the last growth iteration.
    pub training_rmse: f64,
    pub leaves: usize,
    pub iterations: usize,
    pub converged: bool,
}

/// Summary of a completed fit.
///
/// RMSE values marked "report rows" are measured on the Validate partition,
/// or on the training rows when the dataset has none.
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    /// RMSE of the linear warm start over the training rows.
    pub linear_rmse: f64,
    /// Mean noise-variance sample before scaling by the ensemble size.
    pub noise_variance: f64,
    /// F-test limit the ensemble was grown with.
    pub f_limit: f64,
    pub members: Vec<MemberReport>,
    /// RMSE of the ensemble mean on the report rows (denominator `n − 1`).
    pub ensemble_rmse: f64,
    /// Per-input importance on the report rows.
    pub importance: Vec<InputImportance>,
    /// RMSE of the average tree on the report rows.
    pub average_rmse: Option<f64>,
    pub average_leaves: Option<usize>,
    /// RMSE of the final model on the Test partition, if present.
    pub test_rmse: Option<f64>,
}

// =============================================================================
// FittedModel
// =============================================================================

/// Trained ensemble, optional average tree and fit report.
///
/// Predictions come from the average tree when one was trained, and from the
/// ensemble mean otherwise.
#[derive(Debug, Clone)]
pub struct FittedModel {
    ensemble: Ensemble,
    average: Option<Tree>,
    report: FitReport,
    config: FitConfig,
}

impl FittedModel {
    #[inline]
    pub fn ensemble(&self) -> &Ensemble {
        &self.ensemble
    }

    #[inline]
    pub fn average(&self) -> Option<&Tree> {
        self.average.as_ref()
    }

    #[inline]
    pub fn report(&self) -> &FitReport {
        &self.report
    }

    #[inline]
    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// The tree that stands for the whole model: the average tree, or the
    /// first ensemble member.
    pub fn final_tree(&self) -> &Tree {
        self.average.as_ref().unwrap_or(&self.ensemble.members()[0])
    }

    /// Export [`final_tree`](Self::final_tree) with the configured depth limit.
    pub fn export(&self) -> Result<DecisionTree, ExportError> {
        self.export_with_depth(self.config.max_depth)
    }

    /// Export [`final_tree`](Self::final_tree) with an explicit depth limit.
    pub fn export_with_depth(&self, max_depth: usize) -> Result<DecisionTree, ExportError> {
        DecisionTree::export(self.final_tree(), max_depth)
    }
}

impl Evaluate for FittedModel {
    fn n_inputs(&self) -> usize {
        self.ensemble.n_inputs()
    }

    fn predict(&self, x: &[f64]) -> f64 {
        match &self.average {
            Some(tree) => tree.predict(x),
            None => self.ensemble.predict(x),
        }
    }
}

// =============================================================================
// Fitter
// =============================================================================

/// Runs the fit pipeline with a fixed configuration.
#[derive(Debug, Clone)]
pub struct Fitter {
    config: FitConfig,
}

impl Fitter {
    pub fn new(config: FitConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Fit `dataset`.
    ///
    /// # Errors
    ///
    /// - [`FitError::Config`] if the configuration was modified into an invalid state
    /// - [`FitError::Dataset`] for degenerate data
    /// - [`FitError::Train`] when a tree cannot be trained
    pub fn fit(&self, dataset: &Dataset) -> Result<FittedModel, FitError> {
        self.fit_with(dataset, None, CancelToken::new())
    }

    /// Fit with optional progress reporting and a cancellation token.
    ///
    /// Cancellation is checked between growth iterations and yields
    /// [`FitError::Cancelled`].
    pub fn fit_with(
        &self,
        dataset: &Dataset,
        progress: Option<Sender<Progress>>,
        cancel: CancelToken,
    ) -> Result<FittedModel, FitError> {
        self.config.validate()?;
        let mut ctx = TrainingContext::new(self.config.seed, TrainingLogger::new(self.config.verbosity))
            .with_cancel(cancel);
        if let Some(progress) = progress {
            ctx = ctx.with_progress(progress);
        }

        run_with_threads(self.config.n_threads, |parallelism| {
            self.fit_inner(dataset, ctx, parallelism)
        })
    }

    /// Internal pipeline (no thread pool management).
    fn fit_inner(
        &self,
        dataset: &Dataset,
        mut ctx: TrainingContext,
        parallelism: Parallelism,
    ) -> Result<FittedModel, FitError> {
        let config = &self.config;
        let rows = dataset.training_rows();
        let constraints = Constraints::derive(rows, &config.constraint_overrides())?;

        // Linear warm start: all rounds back to back on one frozen leaf
        ctx.report(Progress::PhaseStarted { phase: Phase::LinearRegression });
        let linear = AdaptParams {
            epochs: config.linear.epochs_per_round * config.linear.max_iterations,
            ..config.linear.adapt_params(config.min_rmse, config.jitter)
        };
        let warm = linear_regression(rows, &constraints, linear, &mut ctx)
            .map_err(|e| FitError::train(Phase::LinearRegression, None, e))?;
        ctx.report(Progress::PhaseFinished { phase: Phase::LinearRegression });
        if ctx.is_cancelled() {
            return Err(FitError::Cancelled);
        }

        // Noise estimation
        ctx.report(Progress::PhaseStarted { phase: Phase::NoiseEstimation });
        let estimator = NoiseEstimator::new(NoiseParams {
            adapt: config.overtrain.adapt_params(0.0, false),
            max_iterations: config.overtrain.max_iterations,
            overtrain_ratio: config.overtrain_ratio,
        });
        let noise = estimator
            .estimate(rows, &constraints, &warm.seed, parallelism, &mut ctx)
            .map_err(|e| FitError::train(Phase::NoiseEstimation, None, e))?;
        ctx.logger.finish_phase(Phase::NoiseEstimation, noise.mean().sqrt());
        ctx.report(Progress::PhaseFinished { phase: Phase::NoiseEstimation });

        // Ensemble
        let f_limit = config.f_limit.resolve(rows.dimension());
        let controller = SplitController::new(
            SplitParams::new(SplitCriterion::FTest { f_limit }).with_operator(config.operator),
        );
        let grower = Grower::new(
            AdaptiveTrainer::new(config.approximation.adapt_params(config.min_rmse, config.jitter)),
            controller,
            config.approximation.max_iterations,
        );
        ctx.set_phase(Phase::Approximation);
        ctx.logger.start_phase(Phase::Approximation);
        ctx.report(Progress::PhaseStarted { phase: Phase::Approximation });
        let ensemble = Ensemble::train(
            rows,
            &noise,
            &constraints,
            &warm.seed,
            &grower,
            config.n_trees,
            config.smoothing,
            parallelism,
            &ctx,
        )?;

        let report_rows = dataset.report_rows();
        let ensemble_report = ensemble.report(report_rows)?;
        ctx.logger.finish_phase(Phase::Approximation, ensemble_report.rmse);
        ctx.report(Progress::PhaseFinished { phase: Phase::Approximation });

        // Average tree
        let average = if config.train_average {
            ctx.report(Progress::PhaseStarted { phase: Phase::Average });
            let grower = Grower::new(
                AdaptiveTrainer::new(config.average.adapt_params(config.min_rmse, config.jitter)),
                controller,
                config.average.max_iterations,
            );
            let (tree, _) = ensemble
                .train_average(rows, &warm.seed, &grower, &mut ctx)
                .map_err(|e| FitError::train(Phase::Average, None, e))?;
            ctx.report(Progress::PhaseFinished { phase: Phase::Average });
            Some(tree)
        } else {
            None
        };

        let members = ensemble
            .summaries()
            .iter()
            .zip(&ensemble_report.member_rmse)
            .map(|(summary, &rmse)| MemberReport {
                rmse,
                training_rmse: summary.rmse,
                leaves: summary.leaves,
                iterations: summary.iterations,
                converged: summary.converged,
            })
            .collect();

        let report = FitReport {
            linear_rmse: warm.rmse,
            noise_variance: noise.mean(),
            f_limit,
            members,
            ensemble_rmse: ensemble_report.rmse,
            importance: ensemble_report.importance,
            average_rmse: average.as_ref().map(|tree| tree.rmse(report_rows)),
            average_leaves: average.as_ref().map(Tree::n_leaves),
            test_rmse: None,
        };

        let mut model = FittedModel {
            ensemble,
            average,
            report,
            config: config.clone(),
        };
        if let Some(test) = dataset.partition(PartitionRole::Test) {
            model.report.test_rmse = Some(model.rmse(test));
        }
        Ok(model)
    }
}
