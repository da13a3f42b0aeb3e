//! Common utilities used across the crate.
//!
//! This module provides parallelism configuration, thread pool setup and the
//! small statistical helpers shared by the dataset and training code.

use rand::Rng;
use rayon::prelude::*;

// =============================================================================
// Statistical Utilities
// =============================================================================

/// Arithmetic mean of a sequence. Returns `0.0` for an empty sequence.
#[inline]
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .fold((0.0f64, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Sample standard deviation (denominator `n - 1`).
///
/// Returns `0.0` when fewer than two values are given.
#[inline]
pub fn sample_stdev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mu = mean(values.iter().copied());
    let ss: f64 = values.iter().map(|&v| (v - mu) * (v - mu)).sum();
    (ss / (n as f64 - 1.0)).sqrt()
}

/// Draw from a symmetric triangular distribution on `[-width, width]`.
///
/// The difference of two uniform draws; used to jitter a sample inside the
/// box of size `width` that belongs to it along one axis.
#[inline]
pub fn triangular<R: Rng + ?Sized>(rng: &mut R, width: f64) -> f64 {
    (rng.gen::<f64>() - rng.gen::<f64>()) * width
}

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// This is a simple flag passed through training components.
/// When `Parallel`, components may use `rayon` parallel iterators.
/// When `Sequential`, components must use sequential iteration.
///
/// The actual thread pool is set up at the fitter level via `n_threads`.
/// Components don't manage thread pools - they just respect this flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    #[inline]
    pub fn maybe_par_map<T, B, I, F>(self, iter: I, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map(f).collect()
        } else {
            iter.into_iter().map(f).collect()
        }
    }

    /// Run two independent closures, concurrently when parallel.
    ///
    /// Both closures have completed when this returns.
    #[inline]
    pub fn maybe_join<A, B, RA, RB>(self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        if self.is_parallel() {
            rayon::join(a, b)
        } else {
            (a(), b())
        }
    }
}

// =============================================================================
// Thread Pool Setup
// =============================================================================

/// Run a closure with the appropriate thread pool.
///
/// Thread count semantics:
/// - `0` = auto (use all available cores)
/// - `1` = sequential (no thread pool)
/// - `n > 1` = use exactly `n` threads
///
/// Falls back to sequential execution if the pool cannot be built.
#[inline]
pub fn run_with_threads<T: Send>(n_threads: usize, f: impl FnOnce(Parallelism) -> T + Send) -> T {
    let parallelism = Parallelism::from_threads(n_threads);

    match parallelism {
        Parallelism::Sequential => f(Parallelism::Sequential),
        Parallelism::Parallel => {
            match rayon::ThreadPoolBuilder::new().num_threads(n_threads).build() {
                Ok(pool) => pool.install(|| f(Parallelism::Parallel)),
                Err(err) => {
                    tracing::warn!(%err, "failed to build thread pool, running sequentially");
                    f(Parallelism::Sequential)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(std::iter::empty()), 0.0);
    }

    #[test]
    fn test_sample_stdev() {
        // 0..=9 has sample variance 55/6
        let values: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert_abs_diff_eq!(sample_stdev(&values), (55.0f64 / 6.0).sqrt(), epsilon = 1e-12);
        assert_eq!(sample_stdev(&[3.0]), 0.0);
    }

    #[test]
    fn test_triangular_bounded() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        for _ in 0..1000 {
            let v = triangular(&mut rng, 0.5);
            assert!((-0.5..=0.5).contains(&v));
        }
    }

    #[test]
    fn test_parallelism_from_threads() {
        assert!(!Parallelism::from_threads(1).is_parallel()); // 1 = sequential
        assert!(Parallelism::from_threads(2).is_parallel()); // >1 = parallel
        assert!(Parallelism::from_threads(8).is_parallel());
    }

    #[test]
    fn test_run_with_threads_explicit() {
        let result = run_with_threads(2, |_| rayon::current_num_threads());
        assert_eq!(result, 2);
    }

    #[test]
    fn test_maybe_par_map() {
        let result: Vec<_> = Parallelism::Sequential.maybe_par_map(0..5usize, |i| i * 2);
        assert_eq!(result, vec![0, 2, 4, 6, 8]);

        let result: Vec<_> = Parallelism::Parallel.maybe_par_map(0..5usize, |i| i * 2);
        assert_eq!(result, vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn test_maybe_join() {
        let (a, b) = Parallelism::Parallel.maybe_join(|| 1, || 2);
        assert_eq!((a, b), (1, 2));
        let (a, b) = Parallelism::Sequential.maybe_join(|| "x", || "y");
        assert_eq!((a, b), ("x", "y"));
    }
}
