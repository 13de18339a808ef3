//! Data models for ecd-pipeline
//!
//! - Instance matrices, label arrays, train/test split
//! - Run session state machine and log
//! - Per-entity reports and outcomes

pub mod instance;
pub mod report;
pub mod session;

pub use instance::{InstanceMatrix, LabelArray, TrainTestSplit, NUM_CLASSES};
pub use report::{
    EntityOutcome, EntityResult, FacetValidity, InstancePrediction, LabelSource,
    ObservableValidity, PerformanceReport, PipelineResult, RegressionMetrics, ReliabilityReport,
};
pub use session::{
    percent_of, AssessmentSession, LogEntry, SessionProgress, SessionState, StateTransition,
};
