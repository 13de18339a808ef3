//! Per-entity results: performance, reliability and outcome

use crate::models::instance::NUM_CLASSES;
use ecd_common::config::AlgorithmKind;
use ecd_common::events::{LogSeverity, PipelineStep};
use ecd_common::EntityKey;
use serde::{Deserialize, Serialize};

/// Error measures between expected and predicted labels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean absolute error
    pub mae: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Relative absolute error (%)
    pub rae_percent: f64,
    /// Root relative squared error (%)
    pub rrse_percent: f64,
}

/// Test-split prediction for one instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstancePrediction {
    /// Row index in the full instance matrix
    pub instance: usize,
    pub expected: i32,
    pub predicted: i32,
}

/// Classifier performance on the test split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub algorithm: AlgorithmKind,
    /// Feature columns the model was trained on
    pub features: Vec<String>,
    pub train_size: usize,
    pub test_size: usize,
    /// Fraction of correctly classified test instances
    pub accuracy: f64,
    /// `1 - accuracy`
    pub error_rate: f64,
    /// Cohen's kappa
    pub kappa: f64,
    /// `confusion_matrix[expected][predicted]`
    pub confusion_matrix: [[usize; NUM_CLASSES]; NUM_CLASSES],
    pub metrics: RegressionMetrics,
    pub predictions: Vec<InstancePrediction>,
    /// Rule set (decision trees only)
    pub rules: Option<Vec<String>>,
}

impl PerformanceReport {
    /// Sum of all confusion matrix cells
    pub fn confusion_total(&self) -> usize {
        self.confusion_matrix.iter().flatten().sum()
    }

    pub fn predicted_labels(&self) -> Vec<i32> {
        self.predictions.iter().map(|p| p.predicted).collect()
    }
}

/// Correlation of one observable with the entity labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservableValidity {
    pub observable: String,
    /// Spearman's rho, None when undefined (e.g. constant labels)
    pub rho: Option<f64>,
}

/// Correlation between a competency's labels and one facet's labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetValidity {
    pub facet: String,
    pub rho: Option<f64>,
}

/// Psychometric reliability and validity statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityReport {
    /// Cronbach's alpha over the entity's observables (None with < 2 items)
    pub cronbach_alpha: Option<f64>,
    pub observable_validity: Vec<ObservableValidity>,
    pub facet_validity: Vec<FacetValidity>,
}

/// Where an entity's labels came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    /// Extracted from an observable named after the entity
    GroundTruth,
    /// Assigned by K-Means
    Clustered,
}

/// Final state of one entity in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityOutcome {
    /// Still moving through the steps
    Pending,
    /// Labelled but training not yet run
    Labelled,
    Trained,
    /// Entity cannot be trained (e.g. no observables); not an error
    Skipped { step: PipelineStep, reason: String },
    Failed {
        step: PipelineStep,
        severity: LogSeverity,
        error: String,
    },
}

impl EntityOutcome {
    pub fn is_active(&self) -> bool {
        matches!(self, EntityOutcome::Pending | EntityOutcome::Labelled)
    }
}

/// Everything the run produced for one entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityResult {
    pub key: EntityKey,
    pub outcome: EntityOutcome,
    pub label_source: Option<LabelSource>,
    /// Observables dropped because their normalized column was degenerate
    pub degenerate_columns: Vec<String>,
    pub reliability: Option<ReliabilityReport>,
    pub performance: Option<PerformanceReport>,
}

/// Per-entity results of one run, in processing order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineResult {
    pub entities: Vec<EntityResult>,
}

impl PipelineResult {
    pub fn entity(&self, key: &EntityKey) -> Option<&EntityResult> {
        self.entities.iter().find(|e| &e.key == key)
    }

    pub fn trained(&self) -> usize {
        self.count(|o| matches!(o, EntityOutcome::Trained))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, EntityOutcome::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, EntityOutcome::Skipped { .. }))
    }

    fn count(&self, pred: impl Fn(&EntityOutcome) -> bool) -> usize {
        self.entities.iter().filter(|e| pred(&e.outcome)).count()
    }
}
