//! End-to-end fits on small synthetic problems.

use pwlfit::approx::assert_abs_diff_eq;
use pwlfit::model::{FitConfig, Fitter, PhaseParams};
use pwlfit::repr::Evaluate;
use pwlfit::testing::{identity, integer_identity, noisy_identity, split_indices, vee};
use pwlfit::training::FLimit;
use pwlfit::{Dataset, Partition, PartitionRole};

fn config(n_trees: usize, f_limit: FLimit, train_average: bool) -> FitConfig {
    FitConfig::builder()
        .n_trees(n_trees)
        .train_average(train_average)
        .f_limit(f_limit)
        .seed(7)
        .linear(PhaseParams {
            max_iterations: 40,
            ..PhaseParams::linear()
        })
        .overtrain(PhaseParams {
            max_iterations: 30,
            ..PhaseParams::overtrain()
        })
        .approximation(PhaseParams {
            max_iterations: 15,
            ..PhaseParams::approximation()
        })
        .average(PhaseParams {
            max_iterations: 10,
            ..PhaseParams::average()
        })
        .build()
        .unwrap()
}

// =============================================================================
// Noiseless identity with an unreachable F-test limit
// =============================================================================

#[test]
fn identity_stays_a_single_plane() {
    let dataset = Dataset::new(identity(100));
    let model = Fitter::new(config(1, FLimit::Fixed(1e12), false))
        .fit(&dataset)
        .unwrap();

    let tree = model.final_tree();
    assert_eq!(tree.n_leaves(), 1);
    let leaf = tree.leaf(0).unwrap();
    assert_abs_diff_eq!(leaf.weights()[0], 1.0, epsilon = 1e-2);
    assert_abs_diff_eq!(leaf.bias(), 0.0, epsilon = 1e-2);
    assert!(model.report().ensemble_rmse < 1e-2);
    assert!(model.report().linear_rmse < 1e-2);

    let exported = model.export().unwrap();
    assert_eq!(exported.n_leaves(), 1);
    assert_eq!(exported.leaves()[0].coefficients.len(), 2);
    assert_eq!(exported.leaves()[0].coefficients[1], -1.0);
}

// =============================================================================
// Noisy identity with a low F-test limit
// =============================================================================

#[test]
fn noisy_identity_splits_with_a_low_limit() {
    let dataset = Dataset::new(noisy_identity(200, 0.1, 3));
    let model = Fitter::new(config(1, FLimit::Fixed(0.05), false))
        .fit(&dataset)
        .unwrap();

    assert!(model.final_tree().n_leaves() >= 2);
    assert!(model.report().noise_variance > 0.0);
    assert!(model.report().members[0].leaves >= 2);
}

// =============================================================================
// Ensemble on noiseless data
// =============================================================================

#[test]
fn noiseless_ensemble_and_average_are_exact() {
    let dataset = Dataset::new(identity(80));
    let model = Fitter::new(config(3, FLimit::default(), true))
        .fit(&dataset)
        .unwrap();

    let report = model.report();
    assert_eq!(report.members.len(), 3);
    for member in &report.members {
        assert!(member.rmse < 1e-2, "member rmse {}", member.rmse);
    }
    assert!(report.ensemble_rmse < 1e-2);
    assert!(report.average_rmse.unwrap() < 1e-2);
    assert_abs_diff_eq!(report.importance[0].mean_weight, 1.0, epsilon = 2e-2);
}

#[test]
fn kink_is_recovered_with_validation_rows() {
    let all = vee(121);
    let (kept, held) = split_indices(all.n_rows(), 0.25, 11);
    let dataset = Dataset::new(all.select(&kept))
        .with_validate(all.select(&held))
        .unwrap();
    let model = Fitter::new(config(2, FLimit::Fixed(1.5), true))
        .fit(&dataset)
        .unwrap();

    assert!(model.ensemble().members().iter().all(|tree| tree.n_leaves() >= 2));
    assert!(model.report().ensemble_rmse < model.report().linear_rmse);
    assert!(model.predict(&[0.0]) < model.predict(&[0.9]));
}

#[test]
fn variance_rows_join_the_training_rows() {
    let train = noisy_identity(60, 0.05, 1);
    let variance = noisy_identity(40, 0.05, 2);
    let test = Partition::from_rows(&[[0.25, 0.25], [0.75, 0.75]], PartitionRole::Test).unwrap();
    let dataset = Dataset::new(train)
        .with_variance(variance)
        .unwrap()
        .with_test(test)
        .unwrap();
    assert_eq!(dataset.training_rows().n_rows(), 100);

    let model = Fitter::new(config(1, FLimit::default(), false))
        .fit(&dataset)
        .unwrap();
    assert!(model.report().test_rmse.unwrap() < 0.1);
}

// =============================================================================
// Ten integer rows, x = 0..9
// =============================================================================

fn defaults(n_trees: usize, f_limit: FLimit, train_average: bool) -> FitConfig {
    FitConfig::builder()
        .n_trees(n_trees)
        .train_average(train_average)
        .f_limit(f_limit)
        .build()
        .unwrap()
}

#[test]
fn ten_rows_identity_is_one_plane() {
    let dataset = Dataset::new(integer_identity(10, 0.0, 0));
    let model = Fitter::new(defaults(1, FLimit::Fixed(1e12), false))
        .fit(&dataset)
        .unwrap();

    let tree = model.final_tree();
    assert_eq!(tree.n_leaves(), 1);
    let leaf = tree.leaf(0).unwrap();
    assert_abs_diff_eq!(leaf.weights()[0], 1.0, epsilon = 1e-2);
    assert_abs_diff_eq!(leaf.bias(), 0.0, epsilon = 5e-2);
    assert!(model.report().ensemble_rmse < 1e-2);
}

#[test]
fn ten_rows_with_gaussian_noise_split() {
    for seed in [3, 9] {
        let dataset = Dataset::new(integer_identity(10, 0.5, seed));
        let model = Fitter::new(defaults(1, FLimit::Fixed(0.05), false))
            .fit(&dataset)
            .unwrap();
        assert!(model.final_tree().n_leaves() >= 2, "seed {seed}");
    }
}

#[test]
fn ten_rows_ensemble_agrees() {
    let dataset = Dataset::new(integer_identity(10, 0.0, 0));
    let model = Fitter::new(defaults(3, FLimit::default(), true))
        .fit(&dataset)
        .unwrap();

    let report = model.report();
    assert!(report.members.iter().all(|m| m.rmse < 1e-2));
    assert!(report.ensemble_rmse < 1e-2);
    assert!(report.average_rmse.unwrap() < 1e-2);
    for x in 0..10 {
        let x = x as f64;
        assert_abs_diff_eq!(model.predict(&[x]), x, epsilon = 5e-2);
    }
}
