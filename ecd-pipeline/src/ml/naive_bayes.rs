//! Gaussian Naive Bayes
//!
//! Per-class, per-feature Normal likelihoods. A small constant (1e-5) is
//! added to every variance so features that are constant within one class
//! still yield a usable density. A feature that is constant over the whole
//! training set carries no information and is rejected as degenerate.

use super::ClassificationModel;
use crate::error::TrainingError;
use std::f64::consts::PI;

/// Variance regularization constant
pub const VARIANCE_REGULARIZATION: f64 = 1e-5;

#[derive(Debug, Clone)]
pub struct GaussianNaiveBayes {
    n_classes: usize,
    regularization: f64,
    /// log prior per class (-inf for classes absent from training)
    log_priors: Vec<f64>,
    /// `means[class][feature]`
    means: Vec<Vec<f64>>,
    /// `variances[class][feature]`, regularized
    variances: Vec<Vec<f64>>,
}

impl GaussianNaiveBayes {
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            regularization: VARIANCE_REGULARIZATION,
            log_priors: Vec::new(),
            means: Vec::new(),
            variances: Vec::new(),
        }
    }

    fn joint_log_likelihood(&self, row: &[f64], class: usize) -> f64 {
        let mut total = self.log_priors[class];
        for ((x, mean), var) in row
            .iter()
            .zip(&self.means[class])
            .zip(&self.variances[class])
        {
            total += -0.5 * (2.0 * PI * var).ln() - (x - mean).powi(2) / (2.0 * var);
        }
        total
    }
}

impl ClassificationModel for GaussianNaiveBayes {
    fn fit(&mut self, features: &[String], x: &[Vec<f64>], y: &[usize]) -> Result<(), TrainingError> {
        let n = x.len();
        let dims = features.len();
        if n == 0 || dims == 0 {
            return Err(TrainingError::EmptyMatrix);
        }

        for column in 0..dims {
            let first = x[0][column];
            if x.iter().all(|row| row[column] == first) {
                return Err(TrainingError::DegenerateFeature {
                    column,
                    name: features[column].clone(),
                });
            }
        }

        let mut counts = vec![0usize; self.n_classes];
        let mut sums = vec![vec![0.0; dims]; self.n_classes];
        for (row, &class) in x.iter().zip(y) {
            counts[class] += 1;
            for (sum, v) in sums[class].iter_mut().zip(row) {
                *sum += v;
            }
        }

        let means: Vec<Vec<f64>> = sums
            .iter()
            .zip(&counts)
            .map(|(sum, &c)| {
                sum.iter()
                    .map(|s| if c > 0 { s / c as f64 } else { 0.0 })
                    .collect()
            })
            .collect();

        let mut squares = vec![vec![0.0; dims]; self.n_classes];
        for (row, &class) in x.iter().zip(y) {
            for (j, v) in row.iter().enumerate() {
                squares[class][j] += (v - means[class][j]).powi(2);
            }
        }

        self.variances = squares
            .iter()
            .zip(&counts)
            .map(|(sq, &c)| {
                sq.iter()
                    .map(|s| {
                        let var = if c > 0 { s / c as f64 } else { 0.0 };
                        var + self.regularization
                    })
                    .collect()
            })
            .collect();
        self.log_priors = counts
            .iter()
            .map(|&c| {
                if c > 0 {
                    (c as f64 / n as f64).ln()
                } else {
                    f64::NEG_INFINITY
                }
            })
            .collect();
        self.means = means;

        tracing::debug!(
            classes = self.n_classes,
            features = dims,
            instances = n,
            "Gaussian Naive Bayes fitted"
        );
        Ok(())
    }

    /// Most probable class per row; ties resolve to the lower class
    fn predict(&self, x: &[Vec<f64>]) -> Vec<usize> {
        if self.log_priors.is_empty() {
            return vec![0; x.len()];
        }
        x.iter()
            .map(|row| {
                let mut best = 0;
                let mut best_score = f64::NEG_INFINITY;
                for class in 0..self.n_classes {
                    let score = self.joint_log_likelihood(row, class);
                    if score > best_score {
                        best_score = score;
                        best = class;
                    }
                }
                best
            })
            .collect()
    }
}
