//! Per-column summary statistics.

use super::Partition;
use crate::utils::sample_stdev;

/// Summary of one column of a partition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation (denominator `n - 1`).
    pub stdev: f64,
}

impl AxisStats {
    /// Statistics of a single column.
    pub fn of_column(partition: &Partition, column: usize) -> Self {
        let values = partition.column(column).to_vec();
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Self {
            min,
            max,
            mean: crate::utils::mean(values.iter().copied()),
            stdev: sample_stdev(&values),
        }
    }

    /// Statistics for every column, output last.
    pub fn of_partition(partition: &Partition) -> Vec<Self> {
        (0..partition.dimension())
            .map(|j| Self::of_column(partition, j))
            .collect()
    }

    /// `max - min`.
    #[inline]
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Sample variance.
    #[inline]
    pub fn variance(&self) -> f64 {
        self.stdev * self.stdev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PartitionRole;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn column_statistics() {
        let p = Partition::new(array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0]], PartitionRole::Train).unwrap();
        let stats = AxisStats::of_partition(&p);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].min, 1.0);
        assert_eq!(stats[0].max, 3.0);
        assert_abs_diff_eq!(stats[0].mean, 2.0);
        assert_abs_diff_eq!(stats[0].stdev, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats[0].range(), 2.0);
        assert_eq!(stats[1].stdev, 0.0);
    }
}
