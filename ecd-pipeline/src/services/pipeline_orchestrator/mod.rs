//! Assessment pipeline orchestrator
//!
//! # State Progression
//! LOADING_DATA → BUILDING_INSTANCES → LABELLING → TRAINING → COMPLETED
//!
//! Each step is handled by a dedicated `phase_*` method and runs on a
//! blocking worker; the next step starts only after the previous worker has
//! returned. Entities are processed sequentially in model order.
//!
//! Per-entity failures are recorded on the entity and in the session log and
//! never stop the run. A step that cannot run at all (e.g. unreadable
//! observable file) moves the session to FAILED. Cancellation is honoured
//! between steps only.

use crate::models::{
    percent_of, AssessmentSession, EntityOutcome, EntityResult, InstanceMatrix, LabelArray,
    PipelineResult, SessionState,
};
use crate::services::statistics::{BuiltinStatistics, StatisticsEngine};
use crate::services::{ArtifactWriter, SessionSummary};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use ecd_common::config::ProjectConfig;
use ecd_common::events::{EventBus, LogSeverity, PipelineEvent, PipelineStep};
use ecd_common::{EntityKey, ObservableSet};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

mod phase_instances;
mod phase_labelling;
mod phase_loading;
mod phase_training;

/// Working state of one entity between steps
struct EntityState {
    result: EntityResult,
    /// Instance matrix as built from the observables
    raw: Option<InstanceMatrix>,
    /// Normalized matrix, degenerate columns still present (NaN)
    normalized: Option<InstanceMatrix>,
    /// Normalized matrix without degenerate columns
    features: Option<InstanceMatrix>,
    labels: Option<LabelArray>,
}

impl EntityState {
    fn new(key: EntityKey) -> Self {
        Self {
            result: EntityResult {
                key,
                outcome: EntityOutcome::Pending,
                label_source: None,
                degenerate_columns: Vec::new(),
                reliability: None,
                performance: None,
            },
            raw: None,
            normalized: None,
            features: None,
            labels: None,
        }
    }

    fn key(&self) -> &EntityKey {
        &self.result.key
    }

    fn is_active(&self) -> bool {
        self.result.outcome.is_active()
    }

    fn fail(&mut self, step: PipelineStep, severity: LogSeverity, error: String) {
        self.result.outcome = EntityOutcome::Failed {
            step,
            severity,
            error,
        };
    }

    fn skip(&mut self, step: PipelineStep, reason: impl Into<String>) {
        self.result.outcome = EntityOutcome::Skipped {
            step,
            reason: reason.into(),
        };
    }
}

/// Everything one run owns; moved into each step's worker and back
struct RunContext {
    project: ProjectConfig,
    writer: ArtifactWriter,
    observables: ObservableSet,
    entities: Vec<EntityState>,
}

impl RunContext {
    fn new(project: ProjectConfig, output_dir: PathBuf) -> Self {
        Self {
            project,
            writer: ArtifactWriter::new(output_dir),
            observables: ObservableSet::new(),
            entities: Vec::new(),
        }
    }

    fn into_result(self) -> PipelineResult {
        PipelineResult {
            entities: self.entities.into_iter().map(|e| e.result).collect(),
        }
    }
}

/// Routes step messages to the session log, the event bus and tracing
struct StepReporter {
    event_bus: EventBus,
    session_id: Uuid,
    step: PipelineStep,
}

impl StepReporter {
    fn log(
        &self,
        session: &mut AssessmentSession,
        severity: LogSeverity,
        entity: Option<&EntityKey>,
        message: impl Into<String>,
    ) {
        let message = message.into();
        let entity = entity.map(|k| k.to_string());
        let entity_field = entity.as_deref().unwrap_or("-");

        match severity {
            LogSeverity::Info => tracing::info!(
                session_id = %self.session_id,
                step = self.step.as_str(),
                entity = entity_field,
                "{}",
                message
            ),
            LogSeverity::Warning => tracing::warn!(
                session_id = %self.session_id,
                step = self.step.as_str(),
                entity = entity_field,
                "{}",
                message
            ),
            LogSeverity::Error => tracing::error!(
                session_id = %self.session_id,
                step = self.step.as_str(),
                entity = entity_field,
                "{}",
                message
            ),
        }

        session.push_log(severity, entity.clone(), message.clone());
        self.event_bus.emit_lossy(PipelineEvent::LogEntry {
            session_id: self.session_id,
            severity,
            entity,
            message,
            timestamp: Utc::now(),
        });
    }

    fn progress(
        &self,
        session: &mut AssessmentSession,
        done: usize,
        total: usize,
        message: impl Into<String>,
    ) {
        let percent = percent_of(done, total);
        let message = message.into();
        session.update_progress(percent, message.clone());
        self.event_bus.emit_lossy(PipelineEvent::StepProgress {
            session_id: self.session_id,
            step: self.step,
            percent,
            message,
            timestamp: Utc::now(),
        });
    }
}

/// Assessment pipeline orchestrator
#[derive(Clone)]
pub struct PipelineOrchestrator {
    event_bus: EventBus,
    stats: Arc<dyn StatisticsEngine>,
}

impl PipelineOrchestrator {
    /// Orchestrator using the built-in statistics engine
    pub fn new(event_bus: EventBus) -> Self {
        Self::with_statistics(event_bus, Arc::new(BuiltinStatistics))
    }

    pub fn with_statistics(event_bus: EventBus, stats: Arc<dyn StatisticsEngine>) -> Self {
        Self { event_bus, stats }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Run all four steps for one project
    ///
    /// Returns the session in a terminal state together with every entity's
    /// result. A panicking step fails the session like any other step
    /// error. `Err` only when the runtime drops a step worker.
    pub async fn execute(
        &self,
        mut session: AssessmentSession,
        project: ProjectConfig,
        output_dir: PathBuf,
        cancel_token: &CancellationToken,
    ) -> Result<(AssessmentSession, PipelineResult)> {
        tracing::info!(
            session_id = %session.session_id,
            project = %session.project,
            output_dir = %output_dir.display(),
            "Starting assessment pipeline"
        );

        self.event_bus.emit_lossy(PipelineEvent::SessionStarted {
            session_id: session.session_id,
            project: session.project.clone(),
            timestamp: Utc::now(),
        });

        let mut ctx = RunContext::new(project, output_dir);

        for step in PipelineStep::ALL {
            if cancel_token.is_cancelled() {
                tracing::info!(
                    session_id = %session.session_id,
                    next_step = step.as_str(),
                    "Pipeline cancelled between steps"
                );
                session.transition_to(SessionState::Cancelled);
                session.update_progress(session.progress.percent, "Cancelled by user");
                break;
            }

            session.transition_to(step.into());
            session.update_progress(0, format!("Step {}: {}", step.number(), step.as_str()));
            self.event_bus.emit_lossy(PipelineEvent::StepStarted {
                session_id: session.session_id,
                step,
                timestamp: Utc::now(),
            });
            tracing::info!(session_id = %session.session_id, "Step {}: {}", step.number(), step.as_str());

            let (returned_session, returned_ctx, outcome) = self.run_step(step, session, ctx).await?;
            session = returned_session;
            ctx = returned_ctx;

            if let Err(e) = outcome {
                let reporter = self.reporter(&session, step);
                reporter.log(
                    &mut session,
                    LogSeverity::Error,
                    None,
                    format!("Step {} failed: {:#}", step.as_str(), e),
                );
                session.transition_to(SessionState::Failed);
                break;
            }

            self.event_bus.emit_lossy(PipelineEvent::StepCompleted {
                session_id: session.session_id,
                step,
                timestamp: Utc::now(),
            });
        }

        if !session.is_terminal() {
            session.transition_to(SessionState::Completed);
            session.update_progress(100, "Assessment complete");
        }

        let writer = ctx.writer.clone();
        let result = ctx.into_result();
        let summary = SessionSummary {
            session: &session,
            entities: &result.entities,
        };
        if let Err(e) = writer.ensure_dir().and_then(|_| writer.write_summary(&summary)) {
            tracing::warn!(session_id = %session.session_id, error = %e, "Failed to write run summary");
        }

        self.event_bus.emit_lossy(PipelineEvent::SessionCompleted {
            session_id: session.session_id,
            state: session.state.as_str().to_string(),
            trained: result.trained(),
            failed: result.failed(),
            skipped: result.skipped(),
            duration_ms: session.elapsed_ms(),
            timestamp: Utc::now(),
        });

        tracing::info!(
            session_id = %session.session_id,
            state = session.state.as_str(),
            trained = result.trained(),
            failed = result.failed(),
            skipped = result.skipped(),
            duration_ms = session.elapsed_ms(),
            "Assessment pipeline finished"
        );

        Ok((session, result))
    }

    /// Run one step on a blocking worker, handing session and context back
    async fn run_step(
        &self,
        step: PipelineStep,
        session: AssessmentSession,
        ctx: RunContext,
    ) -> Result<(AssessmentSession, RunContext, Result<()>)> {
        let orchestrator = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut session = session;
            let mut ctx = ctx;
            let phase = AssertUnwindSafe(|| match step {
                PipelineStep::LoadingData => orchestrator.phase_loading(&mut session, &mut ctx),
                PipelineStep::BuildingInstances => {
                    orchestrator.phase_building_instances(&mut session, &mut ctx)
                }
                PipelineStep::Labelling => orchestrator.phase_labelling(&mut session, &mut ctx),
                PipelineStep::Training => orchestrator.phase_training(&mut session, &mut ctx),
            });
            let outcome = std::panic::catch_unwind(phase).unwrap_or_else(|payload| {
                Err(anyhow!(
                    "Step {} worker panicked: {}",
                    step.as_str(),
                    panic_message(payload.as_ref())
                ))
            });
            (session, ctx, outcome)
        })
        .await
        .with_context(|| format!("Step {} worker was dropped", step.as_str()))
    }

    fn reporter(&self, session: &AssessmentSession, step: PipelineStep) -> StepReporter {
        StepReporter {
            event_bus: self.event_bus.clone(),
            session_id: session.session_id,
            step,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
