//! Step 1: LOADING_DATA
//!
//! Loads the observable table and checks the competency model against it.
//! Unknown observable references are warnings here; the instance step turns
//! them into per-entity errors.

use super::{EntityState, PipelineOrchestrator, RunContext};
use crate::models::AssessmentSession;
use crate::services::{LoadOptions, ObservableLoader};
use anyhow::{Context, Result};
use ecd_common::events::{LogSeverity, PipelineStep};

impl PipelineOrchestrator {
    pub(super) fn phase_loading(
        &self,
        session: &mut AssessmentSession,
        ctx: &mut RunContext,
    ) -> Result<()> {
        let reporter = self.reporter(session, PipelineStep::LoadingData);
        let path = ctx.project.observables_path();
        reporter.progress(session, 0, 2, format!("Loading observables from {}", path.display()));

        ctx.writer.ensure_dir()?;

        let loader = ObservableLoader::new(LoadOptions::from(&ctx.project.project));
        let loaded = loader
            .load(&path)
            .with_context(|| format!("Failed to load observables from {}", path.display()))?;

        for name in &loaded.duplicate_names {
            reporter.log(
                session,
                LogSeverity::Warning,
                None,
                format!("Duplicate observable column '{}' ignored, first column kept", name),
            );
        }
        reporter.log(
            session,
            LogSeverity::Info,
            None,
            format!(
                "Loaded {} observables from {}",
                loaded.observables.len(),
                path.display()
            ),
        );
        reporter.progress(session, 1, 2, "Checking competency model references");

        let mut unknown = ctx.project.competencies.unknown_references(&loaded.observables);
        unknown.extend(ctx.project.uni_competencies.unknown_references(&loaded.observables));
        for (key, name) in &unknown {
            reporter.log(
                session,
                LogSeverity::Warning,
                Some(key),
                format!("Observable '{}' not found in loaded data", name),
            );
        }

        let mut keys = ctx.project.competencies.entity_keys();
        keys.extend(ctx.project.uni_competencies.entity_keys());
        if keys.is_empty() {
            reporter.log(session, LogSeverity::Warning, None, "Project declares no competencies");
        }

        ctx.entities = keys.into_iter().map(EntityState::new).collect();
        ctx.observables = loaded.observables;

        reporter.progress(session, 2, 2, format!("{} entities to assess", ctx.entities.len()));
        Ok(())
    }
}
