//! Pipeline services
//!
//! Each stage of the data-reduction and labelling pipeline is a service;
//! the orchestrator chains them into the four steps of a run.

pub mod artifact_writer;
pub mod classifier;
pub mod clusterer;
pub mod instance_loader;
pub mod label_checker;
pub mod label_extractor;
pub mod normalizer;
pub mod observable_loader;
pub mod pipeline_orchestrator;
pub mod reliability;
pub mod statistics;

pub use artifact_writer::{ArtifactWriter, SessionSummary};
pub use classifier::Classifier;
pub use clusterer::{Clusterer, ClusteringOutcome};
pub use instance_loader::{EntityInstances, InstanceLoader};
pub use label_checker::{LabelChecker, LabelPresenceFlags};
pub use label_extractor::LabelExtractor;
pub use normalizer::{NormalizedMatrix, Normalizer};
pub use observable_loader::{LoadOptions, LoadedObservables, ObservableLoader};
pub use pipeline_orchestrator::PipelineOrchestrator;
pub use reliability::ReliabilityAnalyzer;
pub use statistics::{BuiltinStatistics, CorrelationMethod, StatisticsEngine};
