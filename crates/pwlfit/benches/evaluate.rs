//! Evaluation throughput of trained trees and their flat export.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use pwlfit::model::{FitConfig, Fitter, PhaseParams};
use pwlfit::repr::Evaluate;
use pwlfit::testing::random_surface;
use pwlfit::training::FLimit;
use pwlfit::{Dataset, DecisionTree, Tree};

fn fitted_tree(n_inputs: usize) -> Tree {
    let config = FitConfig::builder()
        .n_trees(1)
        .train_average(false)
        .f_limit(FLimit::Fixed(1.0))
        .approximation(PhaseParams {
            max_iterations: 12,
            ..PhaseParams::approximation()
        })
        .build()
        .unwrap();
    let dataset = Dataset::new(random_surface(2_000, n_inputs, 0.01, 17));
    Fitter::new(config)
        .fit(&dataset)
        .unwrap()
        .final_tree()
        .clone()
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("component/evaluate");

    for n_inputs in [2usize, 8] {
        let tree = fitted_tree(n_inputs);
        let exported = DecisionTree::export(&tree, 64).unwrap();
        let points = random_surface(10_000, n_inputs, 0.0, 99);
        group.throughput(Throughput::Elements(points.n_rows() as u64));

        group.bench_with_input(BenchmarkId::new("tree", n_inputs), &points, |b, points| {
            b.iter(|| black_box(tree.predict_rows(black_box(points))))
        });
        group.bench_with_input(BenchmarkId::new("decision_tree", n_inputs), &points, |b, points| {
            b.iter(|| black_box(exported.predict_rows(black_box(points))))
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .configure_from_args()
        .warm_up_time(Duration::from_secs(1))
        .measurement_time(Duration::from_secs(5))
        .sample_size(10);
    targets = bench_evaluate
}
criterion_main!(benches);
