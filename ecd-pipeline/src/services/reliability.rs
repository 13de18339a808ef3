//! Reliability and validity statistics per entity

use super::statistics::{CorrelationMethod, StatisticsEngine};
use crate::models::{FacetValidity, InstanceMatrix, LabelArray, ObservableValidity, ReliabilityReport};

pub struct ReliabilityAnalyzer<'a> {
    stats: &'a dyn StatisticsEngine,
}

impl<'a> ReliabilityAnalyzer<'a> {
    pub fn new(stats: &'a dyn StatisticsEngine) -> Self {
        Self { stats }
    }

    /// Cronbach's alpha over the matrix columns and Spearman rho of each
    /// column against the labels
    ///
    /// Undefined statistics (too few items, constant series, length
    /// mismatch) are reported as None.
    pub fn analyze(&self, matrix: &InstanceMatrix, labels: &LabelArray) -> ReliabilityReport {
        let columns = matrix.columns_as_series();
        let cronbach_alpha = if columns.len() >= 2 {
            self.stats.reliability(&columns).ok()
        } else {
            None
        };

        let label_values = labels.as_f64();
        let observable_validity = matrix
            .columns
            .iter()
            .zip(&columns)
            .map(|(name, values)| ObservableValidity {
                observable: name.clone(),
                rho: self
                    .stats
                    .correlate(values, &label_values, CorrelationMethod::Spearman)
                    .ok(),
            })
            .collect();

        ReliabilityReport {
            cronbach_alpha,
            observable_validity,
            facet_validity: Vec::new(),
        }
    }

    /// Spearman rho between a competency's labels and each facet's labels
    pub fn facet_validity(
        &self,
        competency_labels: &LabelArray,
        facets: &[(String, &LabelArray)],
    ) -> Vec<FacetValidity> {
        let competency = competency_labels.as_f64();
        facets
            .iter()
            .map(|(facet, labels)| FacetValidity {
                facet: facet.clone(),
                rho: self
                    .stats
                    .correlate(&competency, &labels.as_f64(), CorrelationMethod::Spearman)
                    .ok(),
            })
            .collect()
    }
}
