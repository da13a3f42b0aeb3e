//! Linear units: the leaves of a tree.

use super::constraints::AxisConstraint;

/// Accumulators filled by one accounting pass of the split controller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LeafStats {
    /// Sum of squared training residuals routed to this leaf.
    pub sq_error: f64,
    /// Sum of noise-variance samples routed to this leaf.
    pub noise: f64,
    pub train_hits: u64,
    pub variance_hits: u64,
    /// Signed residual-vs-distance accumulator; positive means the residuals
    /// grow away from the centroid (convex region).
    pub curvature: f64,
}

impl LeafStats {
    /// Mean squared training residual, `None` without hits.
    pub fn mse(&self) -> Option<f64> {
        (self.train_hits > 0).then(|| self.sq_error / self.train_hits as f64)
    }

    /// Mean noise-variance sample, `None` without hits.
    pub fn mean_noise(&self) -> Option<f64> {
        (self.variance_hits > 0).then(|| self.noise / self.variance_hits as f64)
    }
}

/// An affine function of the inputs, stored around a centroid.
///
/// The unit evaluates `value + Σ wᵢ·(xᵢ − cᵢ)`, which equals
/// `bias + Σ wᵢ·xᵢ` with `bias = value − Σ wᵢ·cᵢ`. Keeping the centroid near
/// the samples the unit serves keeps the adaptation well conditioned.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearUnit {
    centroid: Vec<f64>,
    value: f64,
    weights: Vec<f64>,
    /// Running second moment of the inputs around the centroid, per axis.
    spread: Vec<f64>,
    growable: bool,
    pub(crate) stats: LeafStats,
}

impl LinearUnit {
    /// Create a unit. All per-axis vectors must have the same length.
    ///
    /// # Panics
    ///
    /// Panics if the lengths of `centroid`, `weights` and `spread` differ.
    pub fn new(centroid: Vec<f64>, value: f64, weights: Vec<f64>, spread: Vec<f64>) -> Self {
        assert_eq!(centroid.len(), weights.len(), "centroid/weights length mismatch");
        assert_eq!(centroid.len(), spread.len(), "centroid/spread length mismatch");
        Self {
            centroid,
            value,
            weights,
            spread,
            growable: true,
            stats: LeafStats::default(),
        }
    }

    /// A flat unit at `value` centered at `centroid`.
    pub fn constant(centroid: Vec<f64>, value: f64, spread: Vec<f64>) -> Self {
        let weights = vec![0.0; centroid.len()];
        Self::new(centroid, value, weights, spread)
    }

    /// Mark the unit as never split.
    pub fn frozen(mut self) -> Self {
        self.growable = false;
        self
    }

    /// A growable copy with cleared accumulators.
    pub fn reseeded(&self) -> Self {
        Self {
            growable: true,
            stats: LeafStats::default(),
            ..self.clone()
        }
    }

    #[inline]
    pub fn n_inputs(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn centroid(&self) -> &[f64] {
        &self.centroid
    }

    /// Value of the unit at its centroid.
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[inline]
    pub fn spread(&self) -> &[f64] {
        &self.spread
    }

    #[inline]
    pub fn is_growable(&self) -> bool {
        self.growable
    }

    #[inline]
    pub fn stats(&self) -> &LeafStats {
        &self.stats
    }

    /// `value − Σ wᵢ·cᵢ`.
    pub fn bias(&self) -> f64 {
        self.value
            - self
                .weights
                .iter()
                .zip(&self.centroid)
                .map(|(w, c)| w * c)
                .sum::<f64>()
    }

    /// Hyperplane coefficients: the input weights followed by `−1` for the output.
    pub fn coefficients(&self) -> Vec<f64> {
        let mut coefficients = self.weights.clone();
        coefficients.push(-1.0);
        coefficients
    }

    /// Evaluate at `x`. Only the first `n_inputs` entries are read.
    #[inline]
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        self.value
            + self
                .weights
                .iter()
                .zip(&self.centroid)
                .zip(x)
                .map(|((w, c), xi)| w * (xi - c))
                .sum::<f64>()
    }

    /// Move the centroid a fraction `rate` of the way toward `x`.
    ///
    /// The function itself is unchanged: the value at the centroid is updated
    /// along the current slope. The spread tracks the squared distance of the
    /// samples from the moved centroid and never drops below `floors[i]`.
    pub(crate) fn recenter(&mut self, x: &[f64], rate: f64, floors: impl Iterator<Item = f64>) {
        for (i, floor) in (0..self.centroid.len()).zip(floors) {
            let step = rate * (x[i] - self.centroid[i]);
            self.centroid[i] += step;
            self.value += self.weights[i] * step;
            let d = x[i] - self.centroid[i];
            self.spread[i] = ((1.0 - rate) * self.spread[i] + rate * d * d).max(floor);
        }
    }

    #[inline]
    pub(crate) fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    /// One normalized least-mean-squares step toward a sample.
    ///
    /// `residual` is the desired minus the predicted output at `x`. The
    /// centroid first moves toward `x` (function unchanged), then the value at
    /// the centroid moves by `rate·residual` and each weight by
    /// `rate·residual·(xᵢ − cᵢ) / (n_inputs·spreadᵢ)`, clamped to its bounds.
    pub(crate) fn adapt(&mut self, x: &[f64], residual: f64, rate: f64, axes: &[AxisConstraint]) {
        self.recenter(x, rate, axes.iter().map(|a| a.tolerance * a.tolerance));
        self.value += rate * residual;
        let scale = rate * residual / self.n_inputs() as f64;
        for (i, axis) in axes.iter().enumerate() {
            let step = scale * (x[i] - self.centroid[i]) / self.spread[i];
            self.weights[i] = axis.clamp_weight(self.weights[i] + step);
        }
    }

    /// How much the function changed relative to `previous`, measured at the
    /// previous centroid: `|Δvalue| + Σ |Δwᵢ|·toleranceᵢ`.
    pub(crate) fn change_from(&self, previous: &LinearUnit, axes: &[AxisConstraint]) -> f64 {
        let value_change = (self.evaluate(&previous.centroid) - previous.value).abs();
        let slope_change: f64 = self
            .weights
            .iter()
            .zip(&previous.weights)
            .zip(axes)
            .map(|((w, w0), axis)| (w - w0).abs() * axis.tolerance)
            .sum();
        value_change + slope_change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn unit() -> LinearUnit {
        LinearUnit::new(vec![1.0, 2.0], 3.0, vec![0.5, -1.0], vec![1.0, 1.0])
    }

    #[test]
    fn centroid_form_matches_bias_form() {
        let u = unit();
        // bias = 3 - (0.5*1 - 1*2) = 4.5
        assert_abs_diff_eq!(u.bias(), 4.5);
        let x = [0.3, -0.7];
        let bias_form = u.bias() + 0.5 * x[0] - 1.0 * x[1];
        assert_abs_diff_eq!(u.evaluate(&x), bias_form, epsilon = 1e-12);
        assert_eq!(u.coefficients(), vec![0.5, -1.0, -1.0]);
    }

    #[test]
    fn evaluate_ignores_output_column() {
        let u = unit();
        assert_eq!(u.evaluate(&[1.0, 2.0]), u.evaluate(&[1.0, 2.0, 99.0]));
    }

    #[test]
    fn recenter_preserves_function() {
        let mut u = unit();
        let probe = [5.0, -3.0];
        let before = u.evaluate(&probe);
        u.recenter(&[3.0, 0.0], 0.5, std::iter::repeat(1e-6));
        assert_abs_diff_eq!(u.centroid()[0], 2.0);
        assert_abs_diff_eq!(u.centroid()[1], 1.0);
        assert_abs_diff_eq!(u.evaluate(&probe), before, epsilon = 1e-12);
    }

    #[test]
    fn spread_is_floored() {
        let mut u = unit();
        for _ in 0..100 {
            u.recenter(&[1.0, 2.0], 0.5, std::iter::repeat(0.25));
        }
        assert!(u.spread().iter().all(|&s| s >= 0.25));
    }

    #[test]
    fn adapt_reduces_residual() {
        let axes = [AxisConstraint {
            tolerance: 0.01,
            min: -10.0,
            max: 10.0,
            weight_min: -100.0,
            weight_max: 100.0,
            stdev: 1.0,
        }];
        let mut u = LinearUnit::new(vec![0.0], 0.0, vec![0.0], vec![1.0]);
        let x = [1.0];
        let target = 2.0;
        let before = (target - u.evaluate(&x)).abs();
        u.adapt(&x, target - u.evaluate(&x), 0.2, &axes);
        let after = (target - u.evaluate(&x)).abs();
        assert!(after < before);
    }

    #[test]
    fn change_from_measures_value_and_slope() {
        let axes = [AxisConstraint {
            tolerance: 0.5,
            min: -10.0,
            max: 10.0,
            weight_min: -100.0,
            weight_max: 100.0,
            stdev: 1.0,
        }];
        let old = LinearUnit::new(vec![0.0], 1.0, vec![1.0], vec![1.0]);
        let new = LinearUnit::new(vec![0.0], 1.5, vec![3.0], vec![1.0]);
        assert_abs_diff_eq!(new.change_from(&old, &axes), 0.5 + 2.0 * 0.5);
        assert_eq!(old.change_from(&old, &axes), 0.0);
    }

    #[test]
    fn stats_means() {
        let stats = LeafStats {
            sq_error: 4.0,
            noise: 1.0,
            train_hits: 2,
            variance_hits: 2,
            curvature: 0.0,
        };
        assert_eq!(stats.mse(), Some(2.0));
        assert_eq!(stats.mean_noise(), Some(0.5));
        assert_eq!(LeafStats::default().mse(), None);
    }

    #[test]
    fn reseeded_clears_stats() {
        let mut u = unit().frozen();
        u.stats.train_hits = 5;
        let r = u.reseeded();
        assert!(r.is_growable());
        assert_eq!(r.stats().train_hits, 0);
        assert_eq!(r.weights(), u.weights());
    }
}
