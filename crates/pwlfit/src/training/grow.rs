//! The growth cycle: alternate adaptive training and split passes.

use super::adapt::AdaptiveTrainer;
use super::context::{Progress, TrainingContext};
use super::error::TrainError;
use super::source::SampleSource;
use super::split::SplitController;
use crate::data::Partition;
use crate::repr::Tree;

/// Rows, targets and (optionally) noise samples used by split passes.
#[derive(Debug, Clone, Copy)]
pub struct GrowthData<'a> {
    pub rows: &'a Partition,
    /// One desired output per row.
    pub targets: &'a [f64],
    /// One noise-variance sample per row.
    pub noise: Option<&'a [f64]>,
}

/// Summary of a completed growth cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthSummary {
    pub iterations: usize,
    /// RMSE against the growth targets after the final accounting pass.
    pub rmse: f64,
    pub leaves: usize,
    /// The last iteration neither split nor changed any leaf materially.
    pub converged: bool,
}

/// Trainer and controller driven together for a bounded number of iterations.
#[derive(Debug, Clone, Copy)]
pub struct Grower {
    pub trainer: AdaptiveTrainer,
    pub controller: SplitController,
    pub max_iterations: usize,
}

impl Grower {
    pub fn new(trainer: AdaptiveTrainer, controller: SplitController, max_iterations: usize) -> Self {
        Self {
            trainer,
            controller,
            max_iterations,
        }
    }

    /// Run `train → grow_pass` until a pass neither splits nor changes
    /// anything, or the iteration budget runs out.
    ///
    /// The final iteration never splits, so every leaf of the returned tree
    /// has been trained.
    ///
    /// # Errors
    ///
    /// Any [`TrainError`] from training or accounting, and
    /// [`TrainError::Cancelled`] when the context's token is set between
    /// iterations.
    pub fn grow<S: SampleSource + ?Sized>(
        &self,
        tree: &mut Tree,
        source: &mut S,
        data: GrowthData<'_>,
        ctx: &mut TrainingContext,
    ) -> Result<GrowthSummary, TrainError> {
        let mut summary = GrowthSummary {
            iterations: 0,
            rmse: f64::INFINITY,
            leaves: tree.n_leaves(),
            converged: false,
        };

        for iteration in 0..self.max_iterations {
            if ctx.is_cancelled() {
                return Err(TrainError::Cancelled);
            }
            let outcome = self.trainer.train(tree, source, ctx)?;

            let last = iteration + 1 == self.max_iterations;
            let (rmse, splits) = if last {
                let rmse = self.controller.account(tree, data.rows, data.targets, data.noise)?;
                (rmse, 0)
            } else {
                let report = self
                    .controller
                    .grow_pass(tree, data.rows, data.targets, data.noise, &ctx.logger)?;
                (report.rmse, report.splits)
            };

            summary = GrowthSummary {
                iterations: iteration + 1,
                rmse,
                leaves: tree.n_leaves(),
                converged: splits == 0 && outcome.converged(),
            };
            ctx.logger.log_iteration(iteration, rmse, summary.leaves, splits);
            ctx.report(Progress::Iteration {
                phase: ctx.phase(),
                member: ctx.member(),
                iteration,
                rmse,
                leaves: summary.leaves,
            });

            if summary.converged {
                break;
            }
        }

        if !summary.converged {
            ctx.logger.warn("growth stopped at the iteration limit");
        }
        Ok(summary)
    }
}
