//! Step 3: LABELLING
//!
//! Per entity, exactly one label source: the ground-truth observable when
//! one carries the entity's name, K-Means otherwise. Reliability statistics
//! and the labelled instance file follow.

use super::{PipelineOrchestrator, RunContext};
use crate::models::{AssessmentSession, EntityOutcome, LabelArray, LabelSource};
use crate::services::{Clusterer, LabelChecker, LabelExtractor, ReliabilityAnalyzer};
use anyhow::Result;
use ecd_common::events::{LogSeverity, PipelineStep};
use ecd_common::EntityKey;
use std::collections::HashMap;

const STEP: PipelineStep = PipelineStep::Labelling;

impl PipelineOrchestrator {
    pub(super) fn phase_labelling(
        &self,
        session: &mut AssessmentSession,
        ctx: &mut RunContext,
    ) -> Result<()> {
        let reporter = self.reporter(session, STEP);

        let mut flags = LabelChecker::check_labelling(&ctx.observables, &ctx.project.competencies);
        flags.extend(LabelChecker::check_labelling_uni(
            &ctx.observables,
            &ctx.project.uni_competencies,
        ));
        reporter.log(
            session,
            LogSeverity::Info,
            None,
            format!(
                "{} of {} entities carry ground-truth labels",
                flags.labelled_count(),
                flags.len()
            ),
        );

        let clusterer = Clusterer::from_settings(&ctx.project.algorithm);
        let analyzer = ReliabilityAnalyzer::new(self.stats.as_ref());

        let total = ctx.entities.len();
        for (done, entity) in ctx.entities.iter_mut().enumerate() {
            if !entity.is_active() {
                continue;
            }
            let Some(features) = entity.features.as_ref() else {
                continue;
            };
            let key = entity.key().clone();
            reporter.progress(session, done, total, format!("Labelling {}", key));

            let (labels, source) = if flags.is_labelled(&key) {
                let Some(labels) = LabelExtractor::extract(&key, &ctx.observables) else {
                    let error = format!("Label column '{}' disappeared", key.name());
                    reporter.log(session, LogSeverity::Error, Some(&key), error.clone());
                    entity.fail(STEP, LogSeverity::Error, error);
                    continue;
                };
                reporter.log(
                    session,
                    LogSeverity::Info,
                    Some(&key),
                    format!("Ground-truth labels taken from observable '{}'", key.name()),
                );
                (labels, LabelSource::GroundTruth)
            } else {
                match clusterer.cluster(features) {
                    Ok(outcome) => {
                        let counts = outcome.labels.class_counts();
                        reporter.log(
                            session,
                            LogSeverity::Info,
                            Some(&key),
                            format!(
                                "K-Means labels assigned (low/medium/high = {}/{}/{})",
                                counts[0], counts[1], counts[2]
                            ),
                        );
                        (outcome.labels, LabelSource::Clustered)
                    }
                    Err(e) => {
                        reporter.log(session, e.severity(), Some(&key), e.to_string());
                        entity.fail(STEP, e.severity(), e.to_string());
                        continue;
                    }
                }
            };

            if let Some(raw) = &entity.raw {
                entity.result.reliability = Some(analyzer.analyze(raw, &labels));
            }
            if let Some(normalized) = &entity.normalized {
                if let Err(e) = ctx.writer.write_arff(&key, normalized, Some(&labels)) {
                    reporter.log(session, LogSeverity::Warning, Some(&key), format!("{:#}", e));
                }
            }

            entity.result.label_source = Some(source);
            entity.result.outcome = EntityOutcome::Labelled;
            entity.labels = Some(labels);
        }

        attach_facet_validity(ctx, &analyzer);

        reporter.progress(session, total, total, "Labelling complete");
        Ok(())
    }
}

/// Competency labels against each facet's labels, where both exist
fn attach_facet_validity(ctx: &mut RunContext, analyzer: &ReliabilityAnalyzer<'_>) {
    let labelled: HashMap<EntityKey, LabelArray> = ctx
        .entities
        .iter()
        .filter_map(|e| e.labels.clone().map(|l| (e.key().clone(), l)))
        .collect();

    for competency in &ctx.project.competencies.competencies {
        let key = EntityKey::competency(&competency.name);
        let Some(labels) = labelled.get(&key) else {
            continue;
        };
        let facets: Vec<(String, &LabelArray)> = competency
            .facets
            .iter()
            .filter_map(|f| {
                labelled
                    .get(&EntityKey::facet(&competency.name, &f.name))
                    .map(|l| (f.name.clone(), l))
            })
            .collect();
        if facets.is_empty() {
            continue;
        }

        let validity = analyzer.facet_validity(labels, &facets);
        if let Some(reliability) = ctx
            .entities
            .iter_mut()
            .find(|e| e.key() == &key)
            .and_then(|e| e.result.reliability.as_mut())
        {
            reliability.facet_validity = validity;
        }
    }
}
