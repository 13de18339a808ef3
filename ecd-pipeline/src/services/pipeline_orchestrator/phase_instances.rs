//! Step 2: BUILDING_INSTANCES
//!
//! Instance matrix per entity, min-max normalization and the unlabelled
//! instance file. Constant columns are dropped from the features with a
//! warning; an entity left without columns is skipped.

use super::{PipelineOrchestrator, RunContext};
use crate::models::AssessmentSession;
use crate::services::{InstanceLoader, Normalizer};
use anyhow::{ensure, Result};
use ecd_common::events::{LogSeverity, PipelineStep};

const STEP: PipelineStep = PipelineStep::BuildingInstances;

impl PipelineOrchestrator {
    pub(super) fn phase_building_instances(
        &self,
        session: &mut AssessmentSession,
        ctx: &mut RunContext,
    ) -> Result<()> {
        let reporter = self.reporter(session, STEP);

        let loader = InstanceLoader::new(&ctx.observables);
        let mut built = loader.load_instances(&ctx.project.competencies);
        built.extend(loader.load_instances_uni(&ctx.project.uni_competencies));
        ensure!(
            built.len() == ctx.entities.len(),
            "Built {} instance sets for {} entities",
            built.len(),
            ctx.entities.len()
        );

        let total = ctx.entities.len();
        for (done, (entity, instances)) in ctx.entities.iter_mut().zip(built).enumerate() {
            ensure!(
                entity.key() == &instances.key,
                "Entity order mismatch: {} vs {}",
                entity.key(),
                instances.key
            );
            let key = instances.key;
            reporter.progress(session, done, total, format!("Building instances for {}", key));

            for name in &instances.excluded {
                reporter.log(
                    session,
                    LogSeverity::Warning,
                    Some(&key),
                    format!("Label column '{}' excluded from features", name),
                );
            }

            let raw = match instances.result {
                Ok(matrix) => matrix,
                Err(e) => {
                    reporter.log(session, e.severity(), Some(&key), e.to_string());
                    entity.fail(STEP, e.severity(), e.to_string());
                    continue;
                }
            };

            if raw.is_empty() {
                let reason = if raw.num_columns() == 0 {
                    "No observables matched; entity cannot be trained"
                } else {
                    "Observables contain no instances; entity cannot be trained"
                };
                reporter.log(session, LogSeverity::Warning, Some(&key), reason);
                entity.skip(STEP, reason);
                continue;
            }

            let normalized = Normalizer::normalize(&raw);
            let degenerate = normalized.degenerate_names();
            for name in &degenerate {
                reporter.log(
                    session,
                    LogSeverity::Warning,
                    Some(&key),
                    format!("Observable '{}' is constant; column dropped", name),
                );
            }
            let features = normalized.without_degenerate();
            entity.result.degenerate_columns = degenerate;

            if let Err(e) = ctx.writer.write_arff(&key, &normalized.matrix, None) {
                reporter.log(session, LogSeverity::Warning, Some(&key), format!("{:#}", e));
            }

            if features.num_columns() == 0 {
                let reason = "Every observable column is constant; entity cannot be trained";
                reporter.log(session, LogSeverity::Warning, Some(&key), reason);
                entity.skip(STEP, reason);
                continue;
            }

            tracing::debug!(
                entity = %key,
                instances = features.num_instances(),
                columns = features.num_columns(),
                "Instance matrix ready"
            );
            entity.raw = Some(raw);
            entity.normalized = Some(normalized.matrix);
            entity.features = Some(features);
        }

        reporter.progress(session, total, total, "Instance matrices built");
        Ok(())
    }
}
