//! Property-based tests on randomly split trees.
//!
//! Trees are grown by splitting randomly chosen leaves with random operators
//! and tilts, so the checks cover shapes that training rarely produces.

use proptest::collection::vec as prop_vec;
use proptest::prelude::*;

use pwlfit::repr::{ConstraintOverrides, Constraints, Evaluate, LinearUnit, Operator, Tree};
use pwlfit::training::{SplitController, SplitCriterion, SplitParams};
use pwlfit::{DecisionTree, Partition, PartitionRole};

// =============================================================================
// Strategies
// =============================================================================

/// Rows of `n_inputs` inputs in `[-1, 1]` and one output.
fn arb_rows(n_inputs: usize) -> impl Strategy<Value = Vec<Vec<f64>>> {
    prop_vec(prop_vec(-1.0f64..1.0, n_inputs + 1), 8..40)
}

/// `(leaf choice, operator, tilt per input)` for each split.
fn arb_splits(n_inputs: usize) -> impl Strategy<Value = Vec<(usize, bool, Vec<f64>)>> {
    prop_vec(
        (any::<usize>(), any::<bool>(), prop_vec(-0.5f64..0.5, n_inputs)),
        0..12,
    )
}

fn build_tree(rows: &Partition, splits: &[(usize, bool, Vec<f64>)], smoothing: f64) -> Option<Tree> {
    let constraints = Constraints::derive(rows, &ConstraintOverrides::default()).ok()?;
    let n = rows.n_inputs();
    let root = LinearUnit::new(vec![0.1; n], 0.2, vec![0.3; n], vec![0.5; n]);
    let mut tree = Tree::new(constraints, root, smoothing);
    for (choice, max, tilt) in splits {
        let leaves = tree.leaves();
        let id = leaves[choice % leaves.len()];
        let op = if *max { Operator::Max } else { Operator::Min };
        let before = tree.n_nodes();
        tree.split(id, op, tilt);
        assert_eq!(tree.n_nodes(), before + 2);
    }
    Some(tree)
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn hit_counts_sum_to_row_count(
        rows in arb_rows(2),
        splits in arb_splits(2),
    ) {
        let rows = Partition::from_rows(&rows, PartitionRole::Train).unwrap();
        let Some(mut tree) = build_tree(&rows, &splits, 0.0) else {
            return Ok(());
        };
        let targets = rows.targets();
        let noise = vec![0.01; rows.n_rows()];
        let controller = SplitController::new(SplitParams::new(SplitCriterion::FTest { f_limit: 2.0 }));
        controller.account(&mut tree, &rows, &targets, Some(&noise)).unwrap();

        let (train, variance) = tree
            .leaves()
            .into_iter()
            .filter_map(|id| tree.leaf(id))
            .fold((0, 0), |(t, v), unit| (t + unit.stats().train_hits, v + unit.stats().variance_hits));
        prop_assert_eq!(train as usize, rows.n_rows());
        prop_assert_eq!(variance as usize, rows.n_rows());
        prop_assert_eq!(tree.n_leaves(), splits.len() + 1);
    }

    #[test]
    fn export_matches_tree(
        rows in arb_rows(3),
        splits in arb_splits(3),
        points in prop_vec(prop_vec(-2.0f64..2.0, 3), 1..20),
        smooth in any::<bool>(),
    ) {
        let rows = Partition::from_rows(&rows, PartitionRole::Train).unwrap();
        let smoothing = if smooth { 0.1 } else { 0.0 };
        let Some(tree) = build_tree(&rows, &splits, smoothing) else {
            return Ok(());
        };
        let exported = DecisionTree::export(&tree, 64).unwrap();
        prop_assert!(exported.validate().is_ok());
        prop_assert_eq!(exported.n_leaves(), tree.n_leaves());
        prop_assert_eq!(exported.depth(), tree.depth());

        for x in &points {
            let expected = tree.predict(x);
            let actual = exported.predict(x);
            prop_assert!((expected - actual).abs() <= 1e-9 * (1.0 + expected.abs()));
        }

        // Each flattened leaf reproduces its source leaf at the source centroid.
        for (leaf, id) in exported.leaves().iter().zip(tree.leaves()) {
            let unit = tree.leaf(id).unwrap();
            let at_centroid = leaf.evaluate(unit.centroid());
            prop_assert!((at_centroid - unit.value()).abs() <= 1e-9 * (1.0 + unit.value().abs()));
            prop_assert_eq!(leaf.coefficients.last().copied(), Some(-1.0));
        }
    }

    #[test]
    fn depth_limit_is_enforced(
        rows in arb_rows(1),
        splits in arb_splits(1),
    ) {
        let rows = Partition::from_rows(&rows, PartitionRole::Train).unwrap();
        let Some(tree) = build_tree(&rows, &splits, 0.0) else {
            return Ok(());
        };
        let depth = tree.depth();
        prop_assert!(DecisionTree::export(&tree, depth).is_ok());
        if depth > 0 {
            prop_assert!(DecisionTree::export(&tree, depth - 1).is_err());
        }
    }
}
