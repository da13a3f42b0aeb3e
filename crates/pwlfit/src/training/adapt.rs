//! Adaptive (LMS) weight training.

use super::context::TrainingContext;
use super::error::TrainError;
use super::source::SampleSource;
use crate::repr::{Evaluation, LinearUnit, NodeId, Tree};
use crate::utils::triangular;

/// Fraction of the output tolerance below which an epoch's change is immaterial.
const SETTLE_FRACTION: f64 = 1e-3;

/// Parameters of the adaptive trainer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptParams {
    /// Step size of every update, in `(0, 1]`.
    pub learning_rate: f64,
    /// Maximum number of passes over the sample source at `learning_rate`.
    pub epochs: usize,
    /// Passes run after `epochs`, with the rate shrinking linearly toward
    /// `learning_rate / (anneal_epochs + 1)`.
    pub anneal_epochs: usize,
    /// Stop as soon as an epoch's RMSE drops below this value.
    pub min_rmse: f64,
    /// Displace each input by a triangular draw within its tolerance.
    pub jitter: bool,
}

impl Default for AdaptParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.15,
            epochs: 20,
            anneal_epochs: 0,
            min_rmse: 0.0,
            jitter: false,
        }
    }
}

/// Result of one call to [`AdaptiveTrainer::train`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainOutcome {
    pub epochs: usize,
    /// RMSE of the last epoch, measured online (before each update).
    pub rmse: f64,
    /// The last epoch changed no leaf materially.
    pub settled: bool,
    pub reached_min_rmse: bool,
}

impl TrainOutcome {
    #[inline]
    pub fn converged(&self) -> bool {
        self.settled || self.reached_min_rmse
    }
}

/// Per-sample gradient training of the active leaf.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveTrainer {
    params: AdaptParams,
}

impl AdaptiveTrainer {
    pub fn new(params: AdaptParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &AdaptParams {
        &self.params
    }

    /// Train `tree` for up to `params.epochs + params.anneal_epochs` passes
    /// over `source`, stopping early once converged.
    ///
    /// Only leaf parameters change; the tree structure is left alone.
    ///
    /// # Errors
    ///
    /// [`TrainError::InputCount`], [`TrainError::EmptyEpoch`] or
    /// [`TrainError::NonFiniteSample`] if the source is unusable.
    pub fn train<S: SampleSource + ?Sized>(
        &self,
        tree: &mut Tree,
        source: &mut S,
        ctx: &mut TrainingContext,
    ) -> Result<TrainOutcome, TrainError> {
        if source.n_inputs() != tree.n_inputs() {
            return Err(TrainError::InputCount {
                expected: tree.n_inputs(),
                actual: source.n_inputs(),
            });
        }

        let settle_tolerance = SETTLE_FRACTION * tree.constraints().output_tolerance;
        let mut inputs = vec![0.0; tree.n_inputs()];
        let mut outcome = TrainOutcome {
            epochs: 0,
            rmse: f64::INFINITY,
            settled: false,
            reached_min_rmse: false,
        };

        for epoch in 0..self.params.epochs + self.params.anneal_epochs {
            let rate = self.rate(epoch);
            let n = source.begin_epoch(&mut ctx.rng);
            if n == 0 {
                return Err(TrainError::EmptyEpoch);
            }
            let snapshot = leaf_snapshot(tree);

            let mut sse = 0.0;
            for k in 0..n {
                let target = source.sample(k, &mut ctx.rng, &mut inputs);
                if !target.is_finite() || inputs.iter().any(|v| !v.is_finite()) {
                    return Err(TrainError::NonFiniteSample { epoch, sample: k });
                }
                if self.params.jitter {
                    for (x, axis) in inputs.iter_mut().zip(&tree.constraints().axes) {
                        *x = axis.clamp_input(*x + triangular(&mut ctx.rng, axis.tolerance));
                    }
                }
                let residual = self.step_at(tree, &inputs, target, rate);
                sse += residual * residual;
            }

            let axes = &tree.constraints().axes;
            let max_change = snapshot
                .iter()
                .filter_map(|(id, previous)| tree.leaf(*id).map(|unit| unit.change_from(previous, axes)))
                .fold(0.0, f64::max);

            outcome.epochs = epoch + 1;
            outcome.rmse = (sse / n as f64).sqrt();
            outcome.reached_min_rmse = outcome.rmse < self.params.min_rmse;
            outcome.settled = max_change <= settle_tolerance;
            ctx.logger.log_epoch(epoch, outcome.rmse, max_change);

            if outcome.converged() {
                break;
            }
        }
        Ok(outcome)
    }

    /// Learning rate of `epoch`, counting from zero.
    pub fn rate(&self, epoch: usize) -> f64 {
        let AdaptParams {
            learning_rate,
            epochs,
            anneal_epochs,
            ..
        } = self.params;
        let remaining = match epoch.checked_sub(epochs) {
            None => return learning_rate,
            Some(k) => anneal_epochs.saturating_sub(k).max(1),
        };
        learning_rate * remaining as f64 / (anneal_epochs + 1) as f64
    }

    /// Adapt the active leaf toward one sample; returns the residual before
    /// the update.
    pub fn step(&self, tree: &mut Tree, x: &[f64], target: f64) -> f64 {
        self.step_at(tree, x, target, self.params.learning_rate)
    }

    fn step_at(&self, tree: &mut Tree, x: &[f64], target: f64, rate: f64) -> f64 {
        let Evaluation { value, leaf } = tree.evaluate(x);
        let residual = target - value;
        if let Some((unit, constraints)) = tree.leaf_with_constraints_mut(leaf) {
            unit.adapt(x, residual, rate, &constraints.axes);
        }
        residual
    }
}

fn leaf_snapshot(tree: &Tree) -> Vec<(NodeId, LinearUnit)> {
    tree.leaves()
        .into_iter()
        .filter_map(|id| tree.leaf(id).map(|unit| (id, unit.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Partition, PartitionRole};
    use crate::repr::{ConstraintOverrides, Constraints, Evaluate};
    use crate::training::source::TableSource;
    use crate::training::{TrainingLogger, Verbosity};
    use approx::assert_abs_diff_eq;

    fn line(n: usize, slope: f64, intercept: f64) -> Partition {
        let rows: Vec<[f64; 2]> = (0..n)
            .map(|i| {
                let x = i as f64 / (n - 1) as f64;
                [x, slope * x + intercept]
            })
            .collect();
        Partition::from_rows(&rows, PartitionRole::Train).unwrap()
    }

    fn flat_tree(rows: &Partition) -> Tree {
        let constraints = Constraints::derive(rows, &ConstraintOverrides::default()).unwrap();
        let centroid = vec![0.5];
        let spread = vec![constraints.axes[0].stdev.powi(2)];
        Tree::new(constraints, LinearUnit::constant(centroid, 0.0, spread), 0.0)
    }

    fn ctx() -> TrainingContext {
        TrainingContext::new(5, TrainingLogger::new(Verbosity::Silent))
    }

    #[test]
    fn learns_a_line() {
        let rows = line(50, 3.0, -1.0);
        let mut tree = flat_tree(&rows);
        let trainer = AdaptiveTrainer::new(AdaptParams {
            learning_rate: 0.2,
            epochs: 500,
            ..AdaptParams::default()
        });
        let outcome = trainer
            .train(&mut tree, &mut TableSource::new(&rows), &mut ctx())
            .unwrap();

        assert!(outcome.converged());
        let leaf = tree.leaf(0).unwrap();
        assert_abs_diff_eq!(leaf.weights()[0], 3.0, epsilon = 1e-2);
        assert_abs_diff_eq!(leaf.bias(), -1.0, epsilon = 1e-2);
        assert!(tree.rmse(&rows) < 1e-2);
    }

    #[test]
    fn min_rmse_stops_early() {
        let rows = line(20, 1.0, 0.0);
        let mut tree = flat_tree(&rows);
        let trainer = AdaptiveTrainer::new(AdaptParams {
            learning_rate: 0.2,
            epochs: 1000,
            min_rmse: 1e3,
            ..AdaptParams::default()
        });
        let outcome = trainer
            .train(&mut tree, &mut TableSource::new(&rows), &mut ctx())
            .unwrap();
        assert_eq!(outcome.epochs, 1);
        assert!(outcome.reached_min_rmse);
    }

    #[test]
    fn anneal_rate_shrinks_after_main_epochs() {
        let trainer = AdaptiveTrainer::new(AdaptParams {
            learning_rate: 0.2,
            epochs: 3,
            anneal_epochs: 4,
            ..AdaptParams::default()
        });
        let rates: Vec<f64> = (0..7).map(|e| trainer.rate(e)).collect();
        assert_eq!(&rates[..3], &[0.2; 3]);
        for (rate, expected) in rates[3..].iter().zip([0.16, 0.12, 0.08, 0.04]) {
            assert_abs_diff_eq!(*rate, expected, epsilon = 1e-12);
        }
        assert!(rates.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn input_count_is_checked() {
        let rows = line(10, 1.0, 0.0);
        let wide = Partition::from_rows(&[[0.0, 1.0, 2.0], [1.0, 0.0, 1.0]], PartitionRole::Train).unwrap();
        let mut tree = flat_tree(&rows);
        let err = AdaptiveTrainer::default()
            .train(&mut tree, &mut TableSource::new(&wide), &mut ctx())
            .unwrap_err();
        assert_eq!(err, TrainError::InputCount { expected: 1, actual: 2 });
    }

    #[test]
    fn jitter_keeps_training_stable() {
        let rows = line(40, 2.0, 0.5);
        let mut tree = flat_tree(&rows);
        let trainer = AdaptiveTrainer::new(AdaptParams {
            learning_rate: 0.15,
            epochs: 200,
            jitter: true,
            ..AdaptParams::default()
        });
        trainer
            .train(&mut tree, &mut TableSource::new(&rows), &mut ctx())
            .unwrap();
        // Jitter moves inputs off the line, so the fit is only approximate.
        assert_abs_diff_eq!(tree.leaf(0).unwrap().weights()[0], 2.0, epsilon = 0.2);
    }
}
