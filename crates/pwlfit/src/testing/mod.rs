//! Synthetic data for tests and benchmarks.

use rand::prelude::*;
use rand_distr::StandardNormal;

use crate::data::{Partition, PartitionRole};

/// `n` evenly spaced rows of `y = x` on `[0, 1]`.
pub fn identity(n: usize) -> Partition {
    assert!(n >= 2);
    let rows: Vec<[f64; 2]> = (0..n)
        .map(|i| {
            let x = i as f64 / (n - 1) as f64;
            [x, x]
        })
        .collect();
    partition(&rows)
}

/// `y = x + u` with `x` uniform on `[0, 1]` and `u` uniform on `[-amplitude, amplitude]`.
pub fn noisy_identity(n: usize, amplitude: f64, seed: u64) -> Partition {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows: Vec<[f64; 2]> = (0..n)
        .map(|_| {
            let x: f64 = rng.gen();
            [x, x + (rng.gen::<f64>() * 2.0 - 1.0) * amplitude]
        })
        .collect();
    partition(&rows)
}

/// Rows `(x, x + e)` for `x = 0, 1, .., n - 1` with `e ~ N(0, sigma²)`.
pub fn integer_identity(n: usize, sigma: f64, seed: u64) -> Partition {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows: Vec<[f64; 2]> = (0..n)
        .map(|i| {
            let e: f64 = rng.sample(StandardNormal);
            [i as f64, i as f64 + sigma * e]
        })
        .collect();
    partition(&rows)
}

/// `n` evenly spaced rows of `y = |x|` on `[-1, 1]`.
pub fn vee(n: usize) -> Partition {
    assert!(n >= 2);
    let rows: Vec<[f64; 2]> = (0..n)
        .map(|i| {
            let x = -1.0 + 2.0 * i as f64 / (n - 1) as f64;
            [x, x.abs()]
        })
        .collect();
    partition(&rows)
}

/// Random points of a piecewise-linear surface over `n_inputs` inputs.
///
/// The output is the maximum of two random planes, plus uniform noise of the
/// given amplitude. Inputs are uniform on `[0, 1]`.
pub fn random_surface(n: usize, n_inputs: usize, amplitude: f64, seed: u64) -> Partition {
    let mut rng = StdRng::seed_from_u64(seed);
    let planes: Vec<Vec<f64>> = (0..2)
        .map(|_| (0..=n_inputs).map(|_| rng.gen::<f64>() * 2.0 - 1.0).collect())
        .collect();
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|_| {
            let mut row: Vec<f64> = (0..n_inputs).map(|_| rng.gen()).collect();
            let y = planes
                .iter()
                .map(|p| p[n_inputs] + p.iter().zip(&row).map(|(w, x)| w * x).sum::<f64>())
                .fold(f64::NEG_INFINITY, f64::max);
            row.push(y + (rng.gen::<f64>() * 2.0 - 1.0) * amplitude);
            row
        })
        .collect();
    partition(&rows)
}

/// Deterministic split of row indices.
///
/// Returns `(kept, held_out)`.
pub fn split_indices(rows: usize, held_out_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    assert!((0.0..1.0).contains(&held_out_fraction));
    let mut idx: Vec<usize> = (0..rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    idx.shuffle(&mut rng);

    let held_out = ((rows as f64 * held_out_fraction).round() as usize).min(rows);
    let (held, kept) = idx.split_at(held_out);
    (kept.to_vec(), held.to_vec())
}

fn partition<R: AsRef<[f64]>>(rows: &[R]) -> Partition {
    Partition::from_rows(rows, PartitionRole::Train).expect("synthetic rows are valid")
}
