//! Bagged ensemble of independently trained trees.

use super::context::{Phase, Progress, TrainingContext};
use super::error::{MemberError, TrainError};
use super::grow::{GrowthData, GrowthSummary, Grower};
use super::noise::NoiseTable;
use super::source::{ResampleSource, TableSource};
use crate::data::{DatasetError, Partition};
use crate::repr::{Constraints, Evaluate, LinearUnit, Tree};
use crate::utils::{mean, sample_stdev, Parallelism};

/// Standard deviations below this are treated as zero in importance ratios.
const MIN_STDEV: f64 = 1e-12;

/// How strongly one input drives the fitted function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputImportance {
    /// `stdev(input) · mean |active weight| / stdev(output)`.
    pub importance: f64,
    /// Mean signed weight of the active leaves.
    pub mean_weight: f64,
}

/// Quality summary of an ensemble on one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleReport {
    /// RMSE of the mean prediction, with denominator `n − 1`.
    pub rmse: f64,
    pub member_rmse: Vec<f64>,
    pub importance: Vec<InputImportance>,
}

/// Trees trained on the same rows, predicting by their mean.
#[derive(Debug, Clone)]
pub struct Ensemble {
    members: Vec<Tree>,
    summaries: Vec<GrowthSummary>,
    /// Noise table divided by the member count.
    noise: NoiseTable,
}

impl Ensemble {
    /// Train `n_trees` members on `rows`.
    ///
    /// Every member starts from `seed`, gets its own random stream and sees
    /// the noise table divided by `n_trees`. Members run concurrently when
    /// `parallelism` allows; any failing member fails the whole ensemble.
    ///
    /// # Panics
    ///
    /// Panics if `n_trees` is zero.
    #[allow(clippy::too_many_arguments)]
    pub fn train(
        rows: &Partition,
        noise: &NoiseTable,
        constraints: &Constraints,
        seed: &LinearUnit,
        grower: &Grower,
        n_trees: usize,
        smoothing: f64,
        parallelism: Parallelism,
        ctx: &TrainingContext,
    ) -> Result<Self, MemberError> {
        assert!(n_trees > 0, "an ensemble needs at least one tree");
        let noise = noise.scaled(1.0 / n_trees as f64);
        let targets = rows.targets();
        let data = GrowthData {
            rows,
            targets: &targets,
            noise: Some(noise.as_slice()),
        };

        let contexts: Vec<TrainingContext> = (0..n_trees)
            .map(|member| {
                let mut member_ctx = ctx.for_member(member);
                member_ctx.set_phase(Phase::Approximation);
                member_ctx
            })
            .collect();

        let results = parallelism.maybe_par_map(contexts, |mut member_ctx| {
            let member = member_ctx.member().unwrap_or_default();
            let mut tree = Tree::new(constraints.clone(), seed.reseeded(), smoothing);
            let summary = grower
                .grow(&mut tree, &mut TableSource::new(rows), data, &mut member_ctx)
                .map_err(|error| MemberError { member, error })?;
            member_ctx.report(Progress::MemberFinished {
                member,
                rmse: summary.rmse,
                leaves: summary.leaves,
            });
            Ok((tree, summary))
        });

        let (members, summaries) = results
            .into_iter()
            .collect::<Result<Vec<_>, MemberError>>()?
            .into_iter()
            .unzip();
        Ok(Self {
            members,
            summaries,
            noise,
        })
    }

    /// Fit one tree to the ensemble mean.
    ///
    /// Training samples are synthesized near the training rows with
    /// [`ResampleSource`]; split passes compare the tree against the ensemble
    /// mean at the training rows, gated by the ensemble's noise table.
    pub fn train_average(
        &self,
        rows: &Partition,
        seed: &LinearUnit,
        grower: &Grower,
        ctx: &mut TrainingContext,
    ) -> Result<(Tree, GrowthSummary), TrainError> {
        ctx.set_phase(Phase::Average);
        ctx.logger.start_phase(Phase::Average);
        let template = &self.members[0];
        let constraints = template.constraints();

        let targets = self.predict_rows(rows);
        let mut tree = Tree::new(constraints.clone(), seed.reseeded(), template.smoothing());
        let mut source = ResampleSource::new(rows, &constraints.axes, self);
        let summary = grower.grow(
            &mut tree,
            &mut source,
            GrowthData {
                rows,
                targets: &targets,
                noise: Some(self.noise.as_slice()),
            },
            ctx,
        )?;
        ctx.logger.finish_phase(Phase::Average, summary.rmse);
        Ok((tree, summary))
    }

    /// RMSE and input importance on `rows`.
    ///
    /// # Errors
    ///
    /// [`DatasetError::ConstantOutput`] if the output of `rows` is constant.
    pub fn report(&self, rows: &Partition) -> Result<EnsembleReport, DatasetError> {
        let n = rows.n_rows();
        let targets = rows.targets();
        let output_stdev = sample_stdev(&targets);
        if output_stdev < MIN_STDEV {
            return Err(DatasetError::ConstantOutput { stdev: output_stdev });
        }

        let n_inputs = rows.n_inputs();
        let mut abs_weight = vec![0.0; n_inputs];
        let mut signed_weight = vec![0.0; n_inputs];
        let mut sse = 0.0;
        for (i, row) in rows.iter_rows().enumerate() {
            let mut prediction = 0.0;
            for tree in &self.members {
                let evaluation = tree.evaluate(row);
                prediction += evaluation.value;
                if let Some(leaf) = tree.leaf(evaluation.leaf) {
                    for (j, &w) in leaf.weights().iter().enumerate() {
                        abs_weight[j] += w.abs();
                        signed_weight[j] += w;
                    }
                }
            }
            let residual = targets[i] - prediction / self.members.len() as f64;
            sse += residual * residual;
        }

        let visits = (n * self.members.len()) as f64;
        let importance = (0..n_inputs)
            .map(|j| {
                let input_stdev = sample_stdev(&rows.column(j).to_vec());
                InputImportance {
                    importance: input_stdev * abs_weight[j] / visits / output_stdev,
                    mean_weight: signed_weight[j] / visits,
                }
            })
            .collect();

        let denominator = n.saturating_sub(1).max(1) as f64;
        Ok(EnsembleReport {
            rmse: (sse / denominator).sqrt(),
            member_rmse: self.members.iter().map(|tree| tree.rmse(rows)).collect(),
            importance,
        })
    }

    #[inline]
    pub fn members(&self) -> &[Tree] {
        &self.members
    }

    #[inline]
    pub fn summaries(&self) -> &[GrowthSummary] {
        &self.summaries
    }

    #[inline]
    pub fn noise(&self) -> &NoiseTable {
        &self.noise
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn into_members(self) -> Vec<Tree> {
        self.members
    }
}

impl Evaluate for Ensemble {
    fn n_inputs(&self) -> usize {
        self.members[0].n_inputs()
    }

    fn predict(&self, x: &[f64]) -> f64 {
        mean(self.members.iter().map(|tree| tree.predict(x)))
    }
}
