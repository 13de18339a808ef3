//! Learning algorithms used by the labelling and training steps

pub mod decision_tree;
pub mod kmeans;
pub mod naive_bayes;

pub use decision_tree::{C45Options, C45Tree};
pub use kmeans::{KMeans, KMeansModel};
pub use naive_bayes::GaussianNaiveBayes;

use crate::error::TrainingError;

/// Supervised classifier over dense numeric features
pub trait ClassificationModel {
    /// Fit on rows `x` with class indices `y`
    fn fit(&mut self, features: &[String], x: &[Vec<f64>], y: &[usize]) -> Result<(), TrainingError>;

    /// Predicted class index per row
    fn predict(&self, x: &[Vec<f64>]) -> Vec<usize>;

    /// Human-readable rule set, if the model has one
    fn rules(&self) -> Option<Vec<String>> {
        None
    }
}
