//! Classifier training and evaluation
//!
//! `train` validates the inputs, splits rows by the percent split (load
//! order, no shuffling), fits the selected model family on the training
//! rows, predicts the test rows and builds the performance report.
//!
//! Precondition order:
//! 1. matrix has at least one column
//! 2. one label per instance
//! 3. every label in {0, 1, 2}
//! 4. each of the three classes present in the full label set
//! 5. both partitions non-empty
//! 6. all feature values finite

use super::statistics::StatisticsEngine;
use crate::error::TrainingError;
use crate::ml::{C45Options, C45Tree, ClassificationModel, GaussianNaiveBayes};
use crate::models::{
    InstanceMatrix, InstancePrediction, LabelArray, PerformanceReport, TrainTestSplit, NUM_CLASSES,
};
use ecd_common::config::{AlgorithmKind, AlgorithmSettings};
use std::sync::Arc;

type ConfusionMatrix = [[usize; NUM_CLASSES]; NUM_CLASSES];

pub struct Classifier {
    settings: AlgorithmSettings,
    stats: Arc<dyn StatisticsEngine>,
}

impl Classifier {
    pub fn new(settings: AlgorithmSettings, stats: Arc<dyn StatisticsEngine>) -> Self {
        Self { settings, stats }
    }

    pub fn train(
        &self,
        matrix: &InstanceMatrix,
        labels: &LabelArray,
        percent_split: f64,
        algorithm: AlgorithmKind,
    ) -> Result<PerformanceReport, TrainingError> {
        if matrix.num_columns() == 0 {
            return Err(TrainingError::EmptyMatrix);
        }
        if matrix.num_instances() != labels.len() {
            return Err(TrainingError::LengthMismatch {
                instances: matrix.num_instances(),
                labels: labels.len(),
            });
        }
        Self::validate_labels(labels)?;

        let split = TrainTestSplit::from_percent(matrix.num_instances(), percent_split);
        if split.train_size == 0 || split.test_size == 0 {
            return Err(TrainingError::EmptyPartition {
                percent: percent_split,
                train: split.train_size,
                test: split.test_size,
            });
        }
        if !matrix.all_finite() {
            return Err(TrainingError::NonFinite);
        }

        let classes: Vec<usize> = labels.labels.iter().map(|&l| l as usize).collect();
        let train_x = &matrix.rows[split.train_range()];
        let test_x = &matrix.rows[split.test_range()];
        let train_y = &classes[split.train_range()];
        let test_y = &classes[split.test_range()];

        let mut model = self.model_for(algorithm);
        model.fit(&matrix.columns, train_x, train_y)?;
        let predicted = model.predict(test_x);

        let confusion_matrix = confusion(test_y, &predicted);
        let correct: usize = (0..NUM_CLASSES).map(|k| confusion_matrix[k][k]).sum();
        let accuracy = correct as f64 / split.test_size as f64;

        let expected_f64: Vec<f64> = test_y.iter().map(|&c| c as f64).collect();
        let predicted_f64: Vec<f64> = predicted.iter().map(|&c| c as f64).collect();
        let metrics = self.stats.regression_metrics(&expected_f64, &predicted_f64)?;

        let predictions = test_y
            .iter()
            .zip(&predicted)
            .enumerate()
            .map(|(i, (&expected, &predicted))| InstancePrediction {
                instance: split.train_size + i,
                expected: expected as i32,
                predicted: predicted as i32,
            })
            .collect();

        tracing::debug!(
            algorithm = %algorithm,
            train = split.train_size,
            test = split.test_size,
            accuracy,
            "Classifier evaluated"
        );

        Ok(PerformanceReport {
            algorithm,
            features: matrix.columns.clone(),
            train_size: split.train_size,
            test_size: split.test_size,
            accuracy,
            error_rate: 1.0 - accuracy,
            kappa: kappa(&confusion_matrix),
            confusion_matrix,
            metrics,
            predictions,
            rules: model.rules(),
        })
    }

    /// Range and class-completeness checks over the full label set
    pub fn validate_labels(labels: &LabelArray) -> Result<[usize; NUM_CLASSES], TrainingError> {
        if let Some((instance, &label)) = labels
            .labels
            .iter()
            .enumerate()
            .find(|&(_, &l)| !(0..NUM_CLASSES as i32).contains(&l))
        {
            return Err(TrainingError::LabelOutOfRange { instance, label });
        }

        let counts = labels.class_counts();
        if counts.iter().any(|&c| c == 0) {
            return Err(TrainingError::MissingClasses { counts });
        }
        Ok(counts)
    }

    fn model_for(&self, algorithm: AlgorithmKind) -> Box<dyn ClassificationModel> {
        match algorithm {
            AlgorithmKind::NaiveBayes => Box::new(GaussianNaiveBayes::new(NUM_CLASSES)),
            AlgorithmKind::DecisionTrees => {
                let dt = &self.settings.decision_trees;
                Box::new(C45Tree::new(
                    NUM_CLASSES,
                    C45Options {
                        confidence_factor: dt.confidence_factor,
                        min_num_obj: dt.min_num_obj,
                        unpruned: dt.unpruned,
                    },
                ))
            }
        }
    }
}

/// `matrix[expected][predicted]`
fn confusion(expected: &[usize], predicted: &[usize]) -> ConfusionMatrix {
    let mut matrix = [[0usize; NUM_CLASSES]; NUM_CLASSES];
    for (&e, &p) in expected.iter().zip(predicted) {
        matrix[e][p] += 1;
    }
    matrix
}

/// Cohen's kappa; 1 for perfect agreement when chance agreement is also 1
fn kappa(matrix: &ConfusionMatrix) -> f64 {
    let total: usize = matrix.iter().flatten().sum();
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    let observed = (0..NUM_CLASSES).map(|k| matrix[k][k]).sum::<usize>() as f64 / n;
    let chance = (0..NUM_CLASSES)
        .map(|k| {
            let row: usize = matrix[k].iter().sum();
            let col: usize = matrix.iter().map(|r| r[k]).sum();
            (row as f64 / n) * (col as f64 / n)
        })
        .sum::<f64>();

    if chance >= 1.0 {
        return if observed >= 1.0 { 1.0 } else { 0.0 };
    }
    (observed - chance) / (1.0 - chance)
}
