//! Per-axis constraints derived from the training rows.

use crate::data::{AxisStats, DatasetError, Partition};

/// Fraction of an axis' standard deviation added on each side of its range.
const DOMAIN_MARGIN: f64 = 0.1;

/// Bounds and tolerance of one input axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisConstraint {
    /// Typical sample spacing along the axis. Scales jitter and the
    /// "material change" test of the trainer.
    pub tolerance: f64,
    pub min: f64,
    pub max: f64,
    pub weight_min: f64,
    pub weight_max: f64,
    /// Standard deviation of the axis over the training rows.
    pub stdev: f64,
}

impl AxisConstraint {
    #[inline]
    pub fn clamp_weight(&self, w: f64) -> f64 {
        w.clamp(self.weight_min, self.weight_max)
    }

    #[inline]
    pub fn clamp_input(&self, x: f64) -> f64 {
        x.clamp(self.min, self.max)
    }
}

/// User overrides applied while deriving [`Constraints`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintOverrides {
    /// Per-axis tolerance; derived from the sample spacing when `None`.
    pub tolerances: Option<Vec<f64>>,
    /// Per-axis `(min, max)` weight bounds, intersected with the derived ones.
    pub weight_bounds: Option<Vec<(f64, f64)>>,
}

/// Constraints for all input axes plus the output scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraints {
    pub axes: Vec<AxisConstraint>,
    pub output_tolerance: f64,
    pub output_mean: f64,
    pub output_stdev: f64,
}

impl Constraints {
    /// Derive constraints from the training rows.
    ///
    /// - domain: `[min − 0.1·stdev, max + 0.1·stdev]`
    /// - tolerance: `(max − min) / n^(1/n_inputs)` unless overridden
    /// - weight bounds: `±√3·stdev(output)/tolerance`, intersected with overrides
    ///
    /// # Errors
    ///
    /// - [`DatasetError::DegenerateAxis`] for a constant input or a zero tolerance
    /// - [`DatasetError::ConstantOutput`] for a (nearly) constant output
    /// - [`DatasetError::OverrideLength`] / [`DatasetError::EmptyWeightBounds`]
    ///   for inconsistent overrides
    pub fn derive(rows: &Partition, overrides: &ConstraintOverrides) -> Result<Self, DatasetError> {
        let n_inputs = rows.n_inputs();
        check_len("tolerances", overrides.tolerances.as_deref(), n_inputs)?;
        check_len("weight_bounds", overrides.weight_bounds.as_deref(), n_inputs)?;

        let stats = AxisStats::of_partition(rows);
        let output = stats[n_inputs];
        if output.stdev <= 1e-12 * output.mean.abs().max(1.0) {
            return Err(DatasetError::ConstantOutput { stdev: output.stdev });
        }

        let spacing = (rows.n_rows() as f64).powf(1.0 / n_inputs as f64);
        let output_tolerance = output.range() / spacing;

        let axes = stats[..n_inputs]
            .iter()
            .enumerate()
            .map(|(axis, s)| {
                let tolerance = match &overrides.tolerances {
                    Some(t) => t[axis],
                    None => s.range() / spacing,
                };
                if s.stdev <= 0.0 || !(tolerance > 0.0 && tolerance.is_finite()) {
                    return Err(DatasetError::DegenerateAxis { axis });
                }

                let bound = 3f64.sqrt() * output.stdev / tolerance;
                let (mut weight_min, mut weight_max) = (-bound, bound);
                if let Some(bounds) = &overrides.weight_bounds {
                    let (lo, hi) = bounds[axis];
                    weight_min = weight_min.max(lo);
                    weight_max = weight_max.min(hi);
                    if weight_min > weight_max {
                        return Err(DatasetError::EmptyWeightBounds { axis });
                    }
                }

                Ok(AxisConstraint {
                    tolerance,
                    min: s.min - DOMAIN_MARGIN * s.stdev,
                    max: s.max + DOMAIN_MARGIN * s.stdev,
                    weight_min,
                    weight_max,
                    stdev: s.stdev,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            axes,
            output_tolerance,
            output_mean: output.mean,
            output_stdev: output.stdev,
        })
    }

    /// Copy with unbounded weights, for overtraining.
    pub fn relaxed(&self) -> Self {
        let mut relaxed = self.clone();
        for axis in &mut relaxed.axes {
            axis.weight_min = f64::NEG_INFINITY;
            axis.weight_max = f64::INFINITY;
        }
        relaxed
    }

    #[inline]
    pub fn n_inputs(&self) -> usize {
        self.axes.len()
    }

    /// Output variance over the training rows.
    #[inline]
    pub fn output_variance(&self) -> f64 {
        self.output_stdev * self.output_stdev
    }
}

fn check_len<T>(field: &'static str, values: Option<&[T]>, expected: usize) -> Result<(), DatasetError> {
    match values {
        Some(v) if v.len() != expected => Err(DatasetError::OverrideLength {
            field,
            expected,
            actual: v.len(),
        }),
        _ => Ok(()),
    }
}
