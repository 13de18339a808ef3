//! Property-based tests for normalization, splitting, training and clustering
//!
//! Uses proptest to check invariants that must hold for any input.

mod helpers;

use ecd_common::config::{AlgorithmKind, AlgorithmSettings};
use ecd_pipeline::models::{LabelArray, TrainTestSplit};
use ecd_pipeline::services::{BuiltinStatistics, Classifier, Clusterer, Normalizer};
use ecd_pipeline::TrainingError;
use helpers::{column_matrix, matrix};
use proptest::prelude::*;
use std::sync::Arc;

fn rows(max_rows: usize) -> impl Strategy<Value = Vec<Vec<f64>>> {
    prop::collection::vec(prop::collection::vec(-1000.0f64..1000.0, 2), 3..max_rows)
}

// =============================================================================
// Normalization
// =============================================================================

proptest! {
    /// Every non-constant column spans exactly [0, 1]
    #[test]
    fn prop_normalized_columns_span_unit_interval(data in rows(40)) {
        let normalized = Normalizer::normalize(&matrix(&["a", "b"], data));

        for j in 0..2 {
            let column = normalized.matrix.column(j);
            if normalized.degenerate_columns.contains(&j) {
                prop_assert!(column.iter().all(|v| v.is_nan()));
                continue;
            }
            let min = column.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = column.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert_eq!(min, 0.0);
            prop_assert_eq!(max, 1.0);
        }
    }

    /// Constant columns are reported, never scaled
    #[test]
    fn prop_constant_column_is_degenerate(value in -1000.0f64..1000.0, n in 1usize..30) {
        let normalized = Normalizer::normalize(&column_matrix(&vec![value; n]));
        prop_assert_eq!(normalized.degenerate_columns, vec![0]);
    }
}

// =============================================================================
// Train/test split
// =============================================================================

proptest! {
    /// Split sizes add up and follow round(n * p / 100)
    #[test]
    fn prop_split_conserves_instances(n in 0usize..10_000, percent in 0.0f64..=100.0) {
        let split = TrainTestSplit::from_percent(n, percent);
        prop_assert_eq!(split.train_size + split.test_size, n);
        prop_assert_eq!(split.train_size, (n as f64 * percent / 100.0).round() as usize);
        prop_assert_eq!(split.test_range().len(), split.test_size);
    }
}

// =============================================================================
// Training
// =============================================================================

proptest! {
    /// The confusion matrix accounts for every test instance
    #[test]
    fn prop_confusion_total_is_test_size(
        values in prop::collection::vec(-100.0f64..100.0, 3..60),
        percent in 1.0f64..99.0,
        trees in any::<bool>(),
    ) {
        let labels = LabelArray::new((0..values.len()).map(|i| (i % 3) as i32).collect());
        let algorithm = if trees { AlgorithmKind::DecisionTrees } else { AlgorithmKind::NaiveBayes };
        let classifier = Classifier::new(AlgorithmSettings::default(), Arc::new(BuiltinStatistics));

        match classifier.train(&column_matrix(&values), &labels, percent, algorithm) {
            Ok(report) => {
                prop_assert_eq!(report.confusion_total(), report.test_size);
                prop_assert_eq!(report.train_size + report.test_size, values.len());
                prop_assert_eq!(report.predictions.len(), report.test_size);
                prop_assert!((0.0..=1.0).contains(&report.accuracy));
                prop_assert!((report.accuracy + report.error_rate - 1.0).abs() < 1e-12);
            }
            Err(TrainingError::EmptyPartition { .. }) | Err(TrainingError::DegenerateFeature { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}

// =============================================================================
// Clustering
// =============================================================================

proptest! {
    /// Same seed, same labels; classes follow centroid means
    #[test]
    fn prop_clustering_is_deterministic_and_ordered(data in rows(40), seed in 0u64..50) {
        let input = matrix(&["a", "b"], data);
        let clusterer = Clusterer::new(1e-4).with_seed(seed);
        let first = clusterer.cluster(&input);
        let second = clusterer.cluster(&input);
        prop_assert_eq!(format!("{:?}", first), format!("{:?}", second));

        if let Ok(outcome) = first {
            prop_assert_eq!(outcome.labels.len(), input.num_instances());
            let mut mapping = outcome.mapping.clone();
            mapping.sort_unstable();
            prop_assert_eq!(mapping, vec![0, 1, 2]);

            let mean_of = |class: i32| {
                let cluster = outcome.mapping.iter().position(|&c| c == class).unwrap();
                outcome.centroid_means[cluster]
            };
            prop_assert!(mean_of(0) < mean_of(1));
            prop_assert!(mean_of(1) < mean_of(2));
        }
    }
}
