//! Read-only evaluation interface shared by trained and exported trees.

use crate::data::Partition;

/// A fitted piecewise-linear function of `n_inputs` variables.
///
/// Implemented by [`Tree`](super::Tree) and by the exported
/// [`DecisionTree`](crate::export::DecisionTree), so reporting code works on
/// either.
pub trait Evaluate {
    /// Number of input variables.
    fn n_inputs(&self) -> usize;

    /// Evaluate at `x`, which holds either the inputs only or a full row
    /// (the trailing output column is ignored).
    ///
    /// # Panics
    ///
    /// Panics if `x` has neither `n_inputs` nor `n_inputs + 1` entries.
    fn predict(&self, x: &[f64]) -> f64;

    /// Predictions for every row of a partition.
    fn predict_rows(&self, rows: &Partition) -> Vec<f64> {
        rows.iter_rows().map(|row| self.predict(row)).collect()
    }

    /// Root mean squared error over a partition.
    fn rmse(&self, rows: &Partition) -> f64 {
        let sse: f64 = rows
            .iter_rows()
            .map(|row| {
                let r = row[row.len() - 1] - self.predict(row);
                r * r
            })
            .sum();
        (sse / rows.n_rows() as f64).sqrt()
    }
}

/// Check the width of an evaluation point.
#[inline]
pub(crate) fn check_point(x: &[f64], n_inputs: usize) {
    assert!(
        x.len() == n_inputs || x.len() == n_inputs + 1,
        "point has {} values, expected {} inputs (optionally followed by the output)",
        x.len(),
        n_inputs
    );
}
