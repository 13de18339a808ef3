//! K-Means labelling for entities without ground truth
//!
//! k = 3, seed 1. After fitting, each cluster's centroid mean (average of
//! the centroid coordinates) orders the clusters: highest mean → class 2
//! (High), lowest → class 0 (Low), the remaining cluster → class 1 (Medium).
//! Centroid means must be strictly distinct, otherwise the ordering is
//! undefined and `AmbiguousOrdering` is returned.

use crate::error::ClusterError;
use crate::ml::KMeans;
use crate::models::{InstanceMatrix, LabelArray, NUM_CLASSES};
use ecd_common::config::{AlgorithmSettings, ClusteringSettings};

/// Labels plus the clustering that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringOutcome {
    pub labels: LabelArray,
    /// Raw K-Means cluster index per instance
    pub assignments: Vec<usize>,
    /// Centroid mean per raw cluster index
    pub centroid_means: Vec<f64>,
    /// Class assigned to each raw cluster index
    pub mapping: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct Clusterer {
    tolerance: f64,
    seed: u64,
    max_iterations: usize,
    n_init: usize,
}

impl Clusterer {
    pub const SEED: u64 = 1;

    pub fn new(tolerance: f64) -> Self {
        let defaults = ClusteringSettings::default();
        Self {
            tolerance,
            seed: Self::SEED,
            max_iterations: defaults.max_iterations,
            n_init: defaults.n_init,
        }
    }

    /// Tolerance of the selected algorithm's options, iteration limits of
    /// the clustering options
    pub fn from_settings(settings: &AlgorithmSettings) -> Self {
        Self {
            max_iterations: settings.clustering.max_iterations,
            n_init: settings.clustering.n_init,
            ..Self::new(settings.tolerance())
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn cluster(&self, matrix: &InstanceMatrix) -> Result<ClusteringOutcome, ClusterError> {
        if matrix.num_columns() == 0 {
            return Err(ClusterError::EmptyMatrix);
        }

        let model = KMeans::new(NUM_CLASSES, self.tolerance)
            .with_seed(self.seed)
            .with_max_iterations(self.max_iterations)
            .with_n_init(self.n_init)
            .fit(&matrix.rows)?;

        let centroid_means: Vec<f64> = model
            .centroids
            .iter()
            .map(|c| c.iter().sum::<f64>() / c.len() as f64)
            .collect();
        let mapping = order_clusters(&centroid_means)?;

        let labels: Vec<i32> = model.assignments.iter().map(|&c| mapping[c]).collect();
        for (instance, (&cluster, &label)) in model.assignments.iter().zip(&labels).enumerate() {
            tracing::debug!(instance, cluster, label, "Cluster relabelled");
        }

        Ok(ClusteringOutcome {
            labels: LabelArray::new(labels),
            assignments: model.assignments,
            centroid_means,
            mapping,
        })
    }
}

/// Class per cluster from centroid means: max → 2, min → 0, others → 1
pub fn order_clusters(means: &[f64]) -> Result<Vec<i32>, ClusterError> {
    let ambiguous = || ClusterError::AmbiguousOrdering {
        means: means.to_vec(),
    };
    if means.iter().any(|m| !m.is_finite()) {
        return Err(ambiguous());
    }

    let mut sorted = means.to_vec();
    sorted.sort_by(f64::total_cmp);
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        return Err(ambiguous());
    }

    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return Err(ambiguous());
    };

    Ok(means
        .iter()
        .map(|&m| {
            if m == max {
                2
            } else if m == min {
                0
            } else {
                1
            }
        })
        .collect())
}
