//! Step 4: TRAINING
//!
//! Trains the selected classifier for every labelled entity and writes its
//! report. A feature that is constant over the training split is dropped and
//! training retried once.

use super::{PipelineOrchestrator, RunContext, StepReporter};
use crate::error::TrainingError;
use crate::models::{
    AssessmentSession, EntityOutcome, InstanceMatrix, LabelArray, PerformanceReport, TrainTestSplit,
};
use crate::services::Classifier;
use anyhow::Result;
use ecd_common::config::AlgorithmKind;
use ecd_common::events::{LogSeverity, PipelineStep};
use ecd_common::EntityKey;
use std::sync::Arc;

const STEP: PipelineStep = PipelineStep::Training;

enum TrainingFailure {
    Skipped(String),
    Failed(TrainingError),
}

impl PipelineOrchestrator {
    pub(super) fn phase_training(
        &self,
        session: &mut AssessmentSession,
        ctx: &mut RunContext,
    ) -> Result<()> {
        let reporter = self.reporter(session, STEP);

        let settings = &ctx.project.algorithm;
        let algorithm = settings.selected;
        let percent = settings.percent_split();
        let classifier = Classifier::new(settings.clone(), Arc::clone(&self.stats));
        reporter.log(
            session,
            LogSeverity::Info,
            None,
            format!("Training {} with a {}% split", algorithm, percent),
        );

        let total = ctx.entities.len();
        for (done, entity) in ctx.entities.iter_mut().enumerate() {
            if entity.result.outcome != EntityOutcome::Labelled {
                continue;
            }
            let (Some(features), Some(labels)) = (entity.features.as_ref(), entity.labels.as_ref())
            else {
                continue;
            };
            let key = entity.key().clone();
            reporter.progress(session, done, total, format!("Training {}", key));

            match train_entity(&classifier, &reporter, session, &key, features, labels, percent, algorithm) {
                Ok(report) => {
                    reporter.log(
                        session,
                        LogSeverity::Info,
                        Some(&key),
                        format!(
                            "Accuracy {:.2}%, kappa {:.3} ({} train / {} test)",
                            report.accuracy * 100.0,
                            report.kappa,
                            report.train_size,
                            report.test_size
                        ),
                    );
                    entity.result.performance = Some(report);
                    entity.result.outcome = EntityOutcome::Trained;
                }
                Err(TrainingFailure::Skipped(reason)) => {
                    reporter.log(session, LogSeverity::Warning, Some(&key), reason.clone());
                    entity.skip(STEP, reason);
                }
                Err(TrainingFailure::Failed(e)) => {
                    reporter.log(session, e.severity(), Some(&key), e.to_string());
                    entity.fail(STEP, e.severity(), e.to_string());
                }
            }

            if let Err(e) = ctx.writer.write_report(&entity.result) {
                reporter.log(session, LogSeverity::Warning, Some(&key), format!("{:#}", e));
            }
        }

        reporter.progress(session, total, total, "Training complete");
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn train_entity(
    classifier: &Classifier,
    reporter: &StepReporter,
    session: &mut AssessmentSession,
    key: &EntityKey,
    features: &InstanceMatrix,
    labels: &LabelArray,
    percent: f64,
    algorithm: AlgorithmKind,
) -> std::result::Result<PerformanceReport, TrainingFailure> {
    match classifier.train(features, labels, percent, algorithm) {
        Err(TrainingError::DegenerateFeature { name, .. }) => {
            reporter.log(
                session,
                LogSeverity::Warning,
                Some(key),
                format!(
                    "Attribute '{}' is constant in the training split; retrying without constant attributes",
                    name
                ),
            );

            let split = TrainTestSplit::from_percent(features.num_instances(), percent);
            let constant = features.constant_columns(split.train_range());
            if constant.len() >= features.num_columns() {
                return Err(TrainingFailure::Skipped(
                    "Every attribute is constant in the training split".to_string(),
                ));
            }
            let reduced = features.without_columns(&constant);
            classifier
                .train(&reduced, labels, percent, algorithm)
                .map_err(TrainingFailure::Failed)
        }
        other => other.map_err(TrainingFailure::Failed),
    }
}
