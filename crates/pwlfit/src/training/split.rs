//! Statistically gated splitting of leaves.
//!
//! An accounting pass routes every training row to its active leaf and
//! accumulates the squared residual and the row's noise-variance sample there.
//! A leaf is split when its training error is significantly larger than the
//! noise it sees ([`SplitCriterion::FTest`]) or, when no noise estimate exists
//! yet, larger than a fixed limit ([`SplitCriterion::Absolute`]).

use super::error::TrainError;
use super::logger::TrainingLogger;
use crate::data::Partition;
use crate::model::ConfigError;
use crate::repr::{NodeId, Operator, Tree};

/// Leaves whose MSE is below `(MSE_FLOOR_RATIO · stdev(output))²` are never split.
const MSE_FLOOR_RATIO: f64 = 1e-6;

/// F-test limits for 90% confidence, indexed by problem dimension.
///
/// Entry `k` is used for dimension `k + 2` up to dimension 10; larger
/// dimensions share the last entries (`> 10`, `> 20`, `> 30`, `> 40`, `> 60`).
#[derive(Debug, Clone, PartialEq)]
pub struct DofTable(Vec<f64>);

impl Default for DofTable {
    fn default() -> Self {
        Self(vec![
            9.00, 5.39, 4.11, 3.45, 3.05, 2.78, 2.59, 2.44, 2.32, 1.79, 1.61, 1.51, 1.40,
        ])
    }
}

impl DofTable {
    /// # Errors
    ///
    /// [`ConfigError::InvalidDofTable`] if the table is empty or holds a value
    /// that is not positive and finite.
    pub fn new(values: Vec<f64>) -> Result<Self, ConfigError> {
        if values.is_empty() || values.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(ConfigError::InvalidDofTable);
        }
        Ok(Self(values))
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// The limit for a problem of `dimension` columns (inputs + output).
    pub fn lookup(&self, dimension: usize) -> f64 {
        let index = match dimension {
            d if d > 60 => 12,
            d if d > 40 => 11,
            d if d > 30 => 10,
            d if d > 20 => 9,
            d if d > 10 => 8,
            d => d.saturating_sub(2),
        };
        self.0[index.min(self.0.len() - 1)]
    }
}

/// How the F-test limit is chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum FLimit {
    /// Look the limit up by dimension.
    DegreesOfFreedom(DofTable),
    /// Use a fixed limit.
    Fixed(f64),
}

impl Default for FLimit {
    fn default() -> Self {
        FLimit::DegreesOfFreedom(DofTable::default())
    }
}

impl FLimit {
    pub fn resolve(&self, dimension: usize) -> f64 {
        match self {
            FLimit::DegreesOfFreedom(table) => table.lookup(dimension),
            FLimit::Fixed(limit) => *limit,
        }
    }
}

/// When a leaf's training error justifies a split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitCriterion {
    /// Split when `mse > f_limit · mean noise variance`.
    FTest { f_limit: f64 },
    /// Split when `mse > limit`, regardless of noise.
    Absolute { limit: f64 },
}

/// Operator of the combination that replaces a split leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatorChoice {
    /// MAX where residuals grow away from the centroid (convex), MIN otherwise.
    #[default]
    Curvature,
    Fixed(Operator),
}

/// Parameters of the split controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitParams {
    pub criterion: SplitCriterion,
    pub operator: OperatorChoice,
    /// Child weights are tilted by `tilt · rmse / sqrt(spreadᵢ)` in opposite directions.
    pub tilt: f64,
}

impl SplitParams {
    pub fn new(criterion: SplitCriterion) -> Self {
        Self {
            criterion,
            operator: OperatorChoice::default(),
            tilt: 1.0,
        }
    }

    pub fn with_operator(mut self, operator: OperatorChoice) -> Self {
        self.operator = operator;
        self
    }
}

/// Result of one [`SplitController::grow_pass`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowReport {
    /// Leaves split in this pass.
    pub splits: usize,
    /// Leaf count after the pass.
    pub leaves: usize,
    /// RMSE over the rows, measured before splitting.
    pub rmse: f64,
}

/// Per-leaf accounting and split decisions.
#[derive(Debug, Clone, Copy)]
pub struct SplitController {
    params: SplitParams,
}

impl SplitController {
    pub fn new(params: SplitParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &SplitParams {
        &self.params
    }

    /// Zero all leaf accumulators and route every row to its active leaf.
    ///
    /// After this pass the train hit counts of all leaves sum to the row count.
    /// Returns the RMSE of `tree` against `targets`.
    ///
    /// # Errors
    ///
    /// [`TrainError::Misaligned`] if `targets` or `noise` do not have one entry
    /// per row.
    pub fn account(
        &self,
        tree: &mut Tree,
        rows: &Partition,
        targets: &[f64],
        noise: Option<&[f64]>,
    ) -> Result<f64, TrainError> {
        check_aligned("targets", targets.len(), rows.n_rows())?;
        if let Some(noise) = noise {
            check_aligned("noise table", noise.len(), rows.n_rows())?;
        }

        tree.reset_stats();
        let n_inputs = tree.n_inputs() as f64;
        let mut sse = 0.0;
        for (i, &target) in targets.iter().enumerate() {
            let x = rows.inputs(i);
            let evaluation = tree.evaluate(x);
            let residual = target - evaluation.value;
            sse += residual * residual;

            let Some(unit) = tree.leaf_mut(evaluation.leaf) else {
                continue;
            };
            let distance: f64 = x
                .iter()
                .zip(unit.centroid())
                .zip(unit.spread())
                .map(|((xi, c), s)| (xi - c) * (xi - c) / s)
                .sum();
            let stats = &mut unit.stats;
            stats.sq_error += residual * residual;
            stats.train_hits += 1;
            stats.curvature += residual * (distance - n_inputs);
            if let Some(noise) = noise {
                stats.noise += noise[i];
                stats.variance_hits += 1;
            }
        }
        Ok((sse / rows.n_rows() as f64).sqrt())
    }

    /// Account, then split every leaf that fails the criterion.
    ///
    /// # Errors
    ///
    /// As [`SplitController::account`].
    pub fn grow_pass(
        &self,
        tree: &mut Tree,
        rows: &Partition,
        targets: &[f64],
        noise: Option<&[f64]>,
        logger: &TrainingLogger,
    ) -> Result<GrowReport, TrainError> {
        let rmse = self.account(tree, rows, targets, noise)?;
        let floor = (MSE_FLOOR_RATIO * tree.constraints().output_stdev).powi(2);

        let candidates: Vec<(NodeId, f64, f64)> = tree
            .leaves()
            .into_iter()
            .filter_map(|id| {
                let unit = tree.leaf(id)?;
                if !unit.is_growable() {
                    return None;
                }
                let mse = unit.stats().mse()?;
                if mse <= floor {
                    return None;
                }
                let threshold = match self.params.criterion {
                    SplitCriterion::FTest { f_limit } => f_limit * unit.stats().mean_noise()?,
                    SplitCriterion::Absolute { limit } => limit,
                };
                (mse > threshold).then_some((id, mse, threshold))
            })
            .collect();

        for &(id, mse, threshold) in &candidates {
            let Some(unit) = tree.leaf(id) else {
                continue;
            };
            let op = match self.params.operator {
                OperatorChoice::Fixed(op) => op,
                OperatorChoice::Curvature if unit.stats().curvature > 0.0 => Operator::Max,
                OperatorChoice::Curvature => Operator::Min,
            };
            let rmse = mse.sqrt();
            let tilt: Vec<f64> = unit
                .spread()
                .iter()
                .map(|s| self.params.tilt * rmse / s.sqrt())
                .collect();
            logger.log_split(id, mse, threshold, op_name(op));
            tree.split(id, op, &tilt);
        }

        Ok(GrowReport {
            splits: candidates.len(),
            leaves: tree.n_leaves(),
            rmse,
        })
    }
}

fn op_name(op: Operator) -> &'static str {
    match op {
        Operator::Min => "min",
        Operator::Max => "max",
    }
}

fn check_aligned(what: &'static str, actual: usize, expected: usize) -> Result<(), TrainError> {
    if actual != expected {
        return Err(TrainError::Misaligned {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PartitionRole;
    use crate::repr::{ConstraintOverrides, Constraints, Evaluate, LinearUnit};
    use crate::training::Verbosity;
    use rstest::rstest;

    /// y = |x| on [-1, 1].
    fn vee(n: usize) -> Partition {
        let rows: Vec<[f64; 2]> = (0..n)
            .map(|i| {
                let x = -1.0 + 2.0 * i as f64 / (n - 1) as f64;
                [x, x.abs()]
            })
            .collect();
        Partition::from_rows(&rows, PartitionRole::Train).unwrap()
    }

    fn flat_tree(rows: &Partition, value: f64) -> Tree {
        let constraints = Constraints::derive(rows, &ConstraintOverrides::default()).unwrap();
        let spread = vec![constraints.axes[0].stdev.powi(2)];
        Tree::new(constraints, LinearUnit::constant(vec![0.0], value, spread), 0.0)
    }

    fn logger() -> TrainingLogger {
        TrainingLogger::new(Verbosity::Silent)
    }

    #[rstest]
    #[case(2, 9.00)]
    #[case(3, 5.39)]
    #[case(10, 2.32)]
    #[case(11, 2.32)]
    #[case(21, 1.79)]
    #[case(31, 1.61)]
    #[case(41, 1.51)]
    #[case(61, 1.40)]
    #[case(500, 1.40)]
    fn dof_lookup(#[case] dimension: usize, #[case] expected: f64) {
        assert_eq!(DofTable::default().lookup(dimension), expected);
    }

    #[test]
    fn dof_table_validation_and_fixed_limit() {
        assert_eq!(DofTable::new(vec![]), Err(ConfigError::InvalidDofTable));
        assert_eq!(DofTable::new(vec![1.0, -1.0]), Err(ConfigError::InvalidDofTable));
        let short = DofTable::new(vec![3.0]).unwrap();
        assert_eq!(short.lookup(50), 3.0);
        assert_eq!(FLimit::Fixed(1.4).resolve(2), 1.4);
        assert_eq!(FLimit::default().resolve(2), 9.0);
    }

    #[test]
    fn hit_counts_sum_to_rows() {
        let rows = vee(41);
        let mut tree = flat_tree(&rows, 0.5);
        tree.split(0, Operator::Max, &[1.0]);
        let noise = vec![0.01; rows.n_rows()];
        SplitController::new(SplitParams::new(SplitCriterion::FTest { f_limit: 1.0 }))
            .account(&mut tree, &rows, &rows.targets(), Some(&noise))
            .unwrap();
        let (train, variance): (u64, u64) = tree
            .leaves()
            .iter()
            .map(|&id| tree.leaf(id).unwrap().stats())
            .fold((0, 0), |(t, v), s| (t + s.train_hits, v + s.variance_hits));
        assert_eq!(train, 41);
        assert_eq!(variance, 41);
    }

    #[test]
    fn curvature_picks_max_for_convex_data() {
        let rows = vee(41);
        // A flat leaf at the mean of |x|: residuals are positive far from 0.
        let mut tree = flat_tree(&rows, 0.5);
        let controller = SplitController::new(SplitParams::new(SplitCriterion::Absolute { limit: 1e-6 }));
        let report = controller
            .grow_pass(&mut tree, &rows, &rows.targets(), None, &logger())
            .unwrap();
        assert_eq!(report.splits, 1);
        assert_eq!(report.leaves, 2);
        assert_eq!(tree.n_nodes(), 3);
        match tree.node(0) {
            crate::repr::Node::Combination(c) => assert_eq!(c.op, Operator::Max),
            _ => panic!("root should be a combination"),
        }
    }

    #[test]
    fn ftest_respects_noise() {
        let rows = vee(41);
        let targets = rows.targets();
        let controller = SplitController::new(SplitParams::new(SplitCriterion::FTest { f_limit: 2.0 }));

        let mut tree = flat_tree(&rows, 0.5);
        let loud = vec![10.0; rows.n_rows()];
        let report = controller
            .grow_pass(&mut tree, &rows, &targets, Some(&loud), &logger())
            .unwrap();
        assert_eq!(report.splits, 0);

        let quiet = vec![1e-6; rows.n_rows()];
        let report = controller
            .grow_pass(&mut tree, &rows, &targets, Some(&quiet), &logger())
            .unwrap();
        assert_eq!(report.splits, 1);

        // Without noise samples the F-test never fires.
        let mut tree = flat_tree(&rows, 0.5);
        let report = controller.grow_pass(&mut tree, &rows, &targets, None, &logger()).unwrap();
        assert_eq!(report.splits, 0);
    }

    #[test]
    fn exact_fit_is_never_split() {
        let rows = vee(41);
        let mut tree = flat_tree(&rows, 0.0);
        tree.split(0, Operator::Max, &[1.0]);
        assert!(tree.rmse(&rows) < 1e-12);
        let controller = SplitController::new(SplitParams::new(SplitCriterion::Absolute { limit: 0.0 }));
        let report = controller
            .grow_pass(&mut tree, &rows, &rows.targets(), None, &logger())
            .unwrap();
        assert_eq!(report.splits, 0);
    }

    #[test]
    fn frozen_leaves_are_not_split() {
        let rows = vee(21);
        let constraints = Constraints::derive(&rows, &ConstraintOverrides::default()).unwrap();
        let unit = LinearUnit::constant(vec![0.0], 0.5, vec![1.0]).frozen();
        let mut tree = Tree::new(constraints, unit, 0.0);
        let controller = SplitController::new(SplitParams::new(SplitCriterion::Absolute { limit: 0.0 }));
        let report = controller
            .grow_pass(&mut tree, &rows, &rows.targets(), None, &logger())
            .unwrap();
        assert_eq!(report.splits, 0);
        assert_eq!(tree.n_nodes(), 1);
    }

    #[test]
    fn misaligned_noise_is_rejected() {
        let rows = vee(5);
        let mut tree = flat_tree(&rows, 0.0);
        let err = SplitController::new(SplitParams::new(SplitCriterion::FTest { f_limit: 1.0 }))
            .account(&mut tree, &rows, &rows.targets(), Some(&[0.0; 3]))
            .unwrap_err();
        assert_eq!(
            err,
            TrainError::Misaligned {
                what: "noise table",
                expected: 5,
                actual: 3
            }
        );
    }
}
