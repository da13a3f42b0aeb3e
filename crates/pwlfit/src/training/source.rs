//! Sample sources feeding the adaptive trainer.

use rand::seq::SliceRandom;
use rand::Rng;

use super::context::TrainRng;
use crate::data::Partition;
use crate::repr::{AxisConstraint, Evaluate};
use crate::utils::triangular;

/// Produces the samples of one training epoch.
pub trait SampleSource {
    /// Number of input values per sample.
    fn n_inputs(&self) -> usize;

    /// Prepare a new epoch and return the number of samples it holds.
    fn begin_epoch(&mut self, rng: &mut TrainRng) -> usize;

    /// Write the inputs of sample `k` of the current epoch into `inputs` and
    /// return its desired output.
    fn sample(&mut self, k: usize, rng: &mut TrainRng, inputs: &mut [f64]) -> f64;
}

/// Rows of a partition, visited in a fresh random order every epoch.
#[derive(Debug)]
pub struct TableSource<'a> {
    rows: &'a Partition,
    order: Vec<usize>,
}

impl<'a> TableSource<'a> {
    pub fn new(rows: &'a Partition) -> Self {
        Self {
            rows,
            order: (0..rows.n_rows()).collect(),
        }
    }
}

impl SampleSource for TableSource<'_> {
    fn n_inputs(&self) -> usize {
        self.rows.n_inputs()
    }

    fn begin_epoch(&mut self, rng: &mut TrainRng) -> usize {
        self.order.shuffle(rng);
        self.order.len()
    }

    fn sample(&mut self, k: usize, _rng: &mut TrainRng, inputs: &mut [f64]) -> f64 {
        let row = self.order[k];
        inputs.copy_from_slice(self.rows.inputs(row));
        self.rows.target(row)
    }
}

/// Synthesized samples near the training rows, labelled by another model.
///
/// Each sample picks a random row, displaces every input by a triangular draw
/// of width equal to the axis tolerance (clamped to the domain) and asks
/// `target` for the desired output at the displaced point.
pub struct ResampleSource<'a> {
    rows: &'a Partition,
    axes: &'a [AxisConstraint],
    target: &'a (dyn Evaluate + Sync),
    epoch_len: usize,
}

impl<'a> ResampleSource<'a> {
    /// # Panics
    ///
    /// Panics if `rows`, `axes` and `target` disagree on the input count.
    pub fn new(rows: &'a Partition, axes: &'a [AxisConstraint], target: &'a (dyn Evaluate + Sync)) -> Self {
        assert_eq!(rows.n_inputs(), axes.len(), "rows and constraints disagree on the input count");
        assert_eq!(rows.n_inputs(), target.n_inputs(), "rows and target disagree on the input count");
        Self {
            rows,
            axes,
            target,
            epoch_len: rows.n_rows(),
        }
    }

    /// Samples per epoch (defaults to the number of rows).
    pub fn with_epoch_len(mut self, epoch_len: usize) -> Self {
        self.epoch_len = epoch_len;
        self
    }
}

impl SampleSource for ResampleSource<'_> {
    fn n_inputs(&self) -> usize {
        self.axes.len()
    }

    fn begin_epoch(&mut self, _rng: &mut TrainRng) -> usize {
        self.epoch_len
    }

    fn sample(&mut self, _k: usize, rng: &mut TrainRng, inputs: &mut [f64]) -> f64 {
        let row = rng.gen_range(0..self.rows.n_rows());
        for ((x, &base), axis) in inputs.iter_mut().zip(self.rows.inputs(row)).zip(self.axes) {
            *x = axis.clamp_input(base + triangular(rng, axis.tolerance));
        }
        self.target.predict(inputs)
    }
}
