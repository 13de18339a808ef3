//! Error types for ecd-pipeline
//!
//! Every per-entity failure is typed so the orchestrator can decide the log
//! severity from the error itself:
//! - configuration errors (missing references, incomplete classes) → ERROR
//! - numeric degeneracy and structural mismatches → WARNING
//!
//! None of these abort the run; the affected entity is skipped and its
//! siblings continue.

use ecd_common::events::LogSeverity;
use thiserror::Error;

/// Observable file loading errors (fatal for the loading step)
#[derive(Debug, Error)]
pub enum ObservableLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Observable file is empty")]
    Empty,

    #[error("Header cell {column} is empty")]
    EmptyHeader { column: usize },

    #[error("Row {row}: {found} cells but only {expected} columns in header")]
    TooManyCells { row: usize, expected: usize, found: usize },

    #[error("Column '{column}', row {row}: invalid number '{value}'")]
    InvalidNumber { column: String, row: usize, value: String },

    #[error("Column '{column}', row {row}: value after an empty cell")]
    Gap { column: String, row: usize },
}

/// Instance matrix construction errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EntityBuildError {
    /// Declared observable names not present in the loaded data
    #[error("Observables not found in loaded data: {}", names.join(", "))]
    MissingObservables { names: Vec<String> },

    /// Observables referenced by one entity have different series lengths
    #[error("Observable '{column}' has {found} instances, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
}

impl EntityBuildError {
    pub fn severity(&self) -> LogSeverity {
        match self {
            EntityBuildError::MissingObservables { .. } => LogSeverity::Error,
            EntityBuildError::LengthMismatch { .. } => LogSeverity::Warning,
        }
    }
}

/// K-Means labelling errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClusterError {
    #[error("Instance matrix has no columns")]
    EmptyMatrix,

    #[error("Need at least {required} instances to form {required} clusters, got {found}")]
    InsufficientInstances { required: usize, found: usize },

    #[error("Instance matrix contains non-finite values")]
    NonFinite,

    /// Two clusters share a centroid mean, so Low/Medium/High is undefined
    #[error("Cluster centroid means are not strictly ordered: {means:?}")]
    AmbiguousOrdering { means: Vec<f64> },
}

impl ClusterError {
    pub fn severity(&self) -> LogSeverity {
        match self {
            ClusterError::EmptyMatrix | ClusterError::InsufficientInstances { .. } => {
                LogSeverity::Error
            }
            ClusterError::NonFinite | ClusterError::AmbiguousOrdering { .. } => {
                LogSeverity::Warning
            }
        }
    }
}

/// Classifier training errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrainingError {
    /// One or more of the ordinal classes has no instance in the full label set
    #[error("Label set is missing classes (counts low/medium/high = {counts:?})")]
    MissingClasses { counts: [usize; 3] },

    #[error("Label {label} at instance {instance} is outside the classes 0, 1, 2")]
    LabelOutOfRange { instance: usize, label: i32 },

    #[error("{labels} labels for {instances} instances")]
    LengthMismatch { instances: usize, labels: usize },

    #[error("Percent split {percent} leaves {train} training and {test} test instances")]
    EmptyPartition { percent: f64, train: usize, test: usize },

    #[error("Instance matrix has no columns")]
    EmptyMatrix,

    #[error("Instance matrix contains non-finite values")]
    NonFinite,

    /// A feature column is constant over the training partition
    #[error("Attribute '{name}' (column {column}) is constant")]
    DegenerateFeature { column: usize, name: String },

    #[error("Statistics engine failed: {0}")]
    Statistics(#[from] StatsError),
}

impl TrainingError {
    /// Configuration errors abort the entity and are reported as errors
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TrainingError::MissingClasses { .. }
                | TrainingError::LabelOutOfRange { .. }
                | TrainingError::LengthMismatch { .. }
                | TrainingError::EmptyPartition { .. }
                | TrainingError::EmptyMatrix
        )
    }

    pub fn severity(&self) -> LogSeverity {
        if self.is_configuration() {
            LogSeverity::Error
        } else {
            LogSeverity::Warning
        }
    }
}

/// Statistics engine errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatsError {
    #[error("Input lengths differ: {0} vs {1}")]
    LengthMismatch(usize, usize),

    #[error("Need at least {required} values, got {found}")]
    InsufficientData { required: usize, found: usize },

    #[error("Zero variance")]
    ZeroVariance,
}
