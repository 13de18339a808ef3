//! ecd-pipeline library interface
//!
//! Evidence-Centered-Design data reduction and labelling: observable
//! loading, per-entity instance matrices, normalization, label extraction
//! or K-Means labelling, classifier training and reporting.

pub mod error;
pub mod ml;
pub mod models;
pub mod services;

pub use crate::error::{ClusterError, EntityBuildError, ObservableLoadError, StatsError, TrainingError};
pub use crate::models::{AssessmentSession, PipelineResult, SessionState};
pub use crate::services::PipelineOrchestrator;
