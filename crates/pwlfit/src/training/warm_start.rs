//! Linear-regression warm start.
//!
//! A single frozen leaf is fitted to all training rows. Its centroid, value
//! and weights seed the root of every tree trained afterwards, and its RMSE is
//! the baseline a piecewise-linear fit has to beat.

use super::adapt::{AdaptParams, AdaptiveTrainer, TrainOutcome};
use super::context::{Phase, TrainingContext};
use super::error::TrainError;
use super::source::TableSource;
use crate::data::{AxisStats, Partition};
use crate::repr::{Constraints, Evaluate, LinearUnit, Tree};

/// A fitted linear model used to seed later trees.
#[derive(Debug, Clone, PartialEq)]
pub struct WarmStart {
    /// Growable copy of the fitted leaf.
    pub seed: LinearUnit,
    /// RMSE of the linear fit over the training rows.
    pub rmse: f64,
    pub outcome: TrainOutcome,
}

/// A flat unit at the output mean, centered on the input means.
pub fn initial_unit(rows: &Partition, constraints: &Constraints) -> LinearUnit {
    let centroid: Vec<f64> = (0..rows.n_inputs())
        .map(|j| AxisStats::of_column(rows, j).mean)
        .collect();
    let spread = constraints
        .axes
        .iter()
        .map(|a| (a.stdev * a.stdev).max(a.tolerance * a.tolerance))
        .collect();
    LinearUnit::constant(centroid, constraints.output_mean, spread)
}

/// Fit one linear unit to `rows`.
///
/// # Errors
///
/// Any [`TrainError`] from the adaptive trainer.
pub fn linear_regression(
    rows: &Partition,
    constraints: &Constraints,
    params: AdaptParams,
    ctx: &mut TrainingContext,
) -> Result<WarmStart, TrainError> {
    ctx.set_phase(Phase::LinearRegression);
    ctx.logger.start_phase(Phase::LinearRegression);

    let root = initial_unit(rows, constraints).frozen();
    let mut tree = Tree::new(constraints.clone(), root, 0.0);
    let outcome = AdaptiveTrainer::new(params).train(&mut tree, &mut TableSource::new(rows), ctx)?;

    let rmse = tree.rmse(rows);
    ctx.logger.finish_phase(Phase::LinearRegression, rmse);
    let seed = tree
        .leaf(0)
        .map(LinearUnit::reseeded)
        .unwrap_or_else(|| initial_unit(rows, constraints));
    Ok(WarmStart { seed, rmse, outcome })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PartitionRole;
    use crate::repr::ConstraintOverrides;
    use crate::training::{TrainingLogger, Verbosity};
    use approx::assert_abs_diff_eq;

    #[test]
    fn fits_a_plane() {
        let rows: Vec<[f64; 3]> = (0..100)
            .map(|i| {
                let a = (i % 10) as f64 / 9.0;
                let b = (i / 10) as f64 / 9.0;
                [a, b, 2.0 * a - b + 0.5]
            })
            .collect();
        let rows = Partition::from_rows(&rows, PartitionRole::Train).unwrap();
        let constraints = Constraints::derive(&rows, &ConstraintOverrides::default()).unwrap();
        let mut ctx = TrainingContext::new(3, TrainingLogger::new(Verbosity::Silent));

        let warm = linear_regression(
            &rows,
            &constraints,
            AdaptParams {
                learning_rate: 0.15,
                epochs: 1500,
                ..AdaptParams::default()
            },
            &mut ctx,
        )
        .unwrap();

        assert!(warm.rmse < 1e-2);
        assert!(warm.seed.is_growable());
        assert_abs_diff_eq!(warm.seed.weights()[0], 2.0, epsilon = 2e-2);
        assert_abs_diff_eq!(warm.seed.weights()[1], -1.0, epsilon = 2e-2);
        assert_abs_diff_eq!(warm.seed.bias(), 0.5, epsilon = 2e-2);
        assert_eq!(ctx.phase(), Phase::LinearRegression);
    }

    #[test]
    fn initial_unit_is_centered() {
        let rows = Partition::from_rows(&[[0.0, 1.0], [2.0, 3.0]], PartitionRole::Train).unwrap();
        let constraints = Constraints::derive(&rows, &ConstraintOverrides::default()).unwrap();
        let unit = initial_unit(&rows, &constraints);
        assert_eq!(unit.centroid(), &[1.0]);
        assert_eq!(unit.value(), 2.0);
        assert_eq!(unit.weights(), &[0.0]);
    }
}
