//! Noise-variance estimation by cross-training on disjoint halves.
//!
//! The training rows are shuffled and cut in two halves. One tree is
//! overtrained on each half with unbounded weights, then each tree predicts
//! the rows of the *other* half. Because an overtrained tree interpolates its
//! own samples, its error on unseen neighbours approximates the label noise.

use rand::seq::SliceRandom;

use super::adapt::{AdaptParams, AdaptiveTrainer};
use super::context::{Phase, TrainingContext};
use super::error::TrainError;
use super::grow::{GrowthData, Grower};
use super::source::TableSource;
use super::split::{SplitController, SplitCriterion, SplitParams};
use crate::data::Partition;
use crate::repr::{Constraints, Evaluate, LinearUnit, Tree};
use crate::utils::{mean, Parallelism};

/// One noise-variance sample per training row.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseTable(Vec<f64>);

impl NoiseTable {
    pub fn new(samples: Vec<f64>) -> Self {
        Self(samples)
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn mean(&self) -> f64 {
        mean(self.0.iter().copied())
    }

    /// Every sample multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self(self.0.iter().map(|v| v * factor).collect())
    }
}

/// Parameters of the overtraining runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseParams {
    pub adapt: AdaptParams,
    pub max_iterations: usize,
    /// Leaves are split while their MSE exceeds this fraction of the output
    /// variance.
    pub overtrain_ratio: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            adapt: AdaptParams {
                learning_rate: 0.2,
                epochs: 5,
                ..AdaptParams::default()
            },
            max_iterations: 120,
            overtrain_ratio: 1e-3,
        }
    }
}

/// Produces a [`NoiseTable`] aligned with the training rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoiseEstimator {
    params: NoiseParams,
}

impl NoiseEstimator {
    pub fn new(params: NoiseParams) -> Self {
        Self { params }
    }

    /// Estimate per-row noise variance.
    ///
    /// `seed` initializes the root of both auxiliary trees. The two trainings
    /// run concurrently when `parallelism` allows and are both complete before
    /// the samples are computed.
    ///
    /// # Errors
    ///
    /// [`TrainError::TooFewRows`] with fewer than two rows, or any error of the
    /// auxiliary trainings.
    pub fn estimate(
        &self,
        rows: &Partition,
        constraints: &Constraints,
        seed: &LinearUnit,
        parallelism: Parallelism,
        ctx: &mut TrainingContext,
    ) -> Result<NoiseTable, TrainError> {
        let n = rows.n_rows();
        if n < 2 {
            return Err(TrainError::TooFewRows(n));
        }
        ctx.set_phase(Phase::NoiseEstimation);
        ctx.logger.start_phase(Phase::NoiseEstimation);

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut ctx.rng);
        let (first, second) = order.split_at(n / 2);
        let half_a = rows.select(first);
        let half_b = rows.select(second);

        let relaxed = constraints.relaxed();
        let mut ctx_a = ctx.fork(1, "noise A");
        let mut ctx_b = ctx.fork(2, "noise B");
        let (tree_a, tree_b) = parallelism.maybe_join(
            || self.overtrain(&half_a, &relaxed, seed, &mut ctx_a),
            || self.overtrain(&half_b, &relaxed, seed, &mut ctx_b),
        );
        let (tree_a, tree_b) = (tree_a?, tree_b?);

        let correction = 1.0 + 1.0 / rows.dimension() as f64;
        let mut samples = vec![0.0; n];
        for (indices, other) in [(first, &tree_b), (second, &tree_a)] {
            for &i in indices {
                let residual = rows.target(i) - other.predict(rows.inputs(i));
                samples[i] = residual * residual / correction;
            }
        }

        let table = NoiseTable(samples);
        ctx.logger.log_noise(table.mean(), table.len());
        Ok(table)
    }

    fn overtrain(
        &self,
        half: &Partition,
        constraints: &Constraints,
        seed: &LinearUnit,
        ctx: &mut TrainingContext,
    ) -> Result<Tree, TrainError> {
        let limit = self.params.overtrain_ratio * constraints.output_variance();
        let grower = Grower::new(
            AdaptiveTrainer::new(self.params.adapt),
            SplitController::new(SplitParams::new(SplitCriterion::Absolute { limit })),
            self.params.max_iterations,
        );
        let mut tree = Tree::new(constraints.clone(), seed.reseeded(), 0.0);
        let targets = half.targets();
        grower.grow(
            &mut tree,
            &mut TableSource::new(half),
            GrowthData {
                rows: half,
                targets: &targets,
                noise: None,
            },
            ctx,
        )?;
        Ok(tree)
    }
}
