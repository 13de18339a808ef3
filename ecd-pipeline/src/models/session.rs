//! Assessment run state machine
//!
//! A session progresses through the four pipeline steps in order:
//! LOADING_DATA → BUILDING_INSTANCES → LABELLING → TRAINING → COMPLETED
//!
//! The session also owns the user-facing log (info / warning / error) that
//! lists every skipped or failed entity.

use chrono::{DateTime, Utc};
use ecd_common::events::{LogSeverity, PipelineStep};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Created, no step started yet
    Created,
    LoadingData,
    BuildingInstances,
    Labelling,
    Training,
    /// All steps finished (individual entities may still have failed)
    Completed,
    /// Cancelled between steps
    Cancelled,
    /// A step could not run at all
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Created => "CREATED",
            SessionState::LoadingData => "LOADING_DATA",
            SessionState::BuildingInstances => "BUILDING_INSTANCES",
            SessionState::Labelling => "LABELLING",
            SessionState::Training => "TRAINING",
            SessionState::Completed => "COMPLETED",
            SessionState::Cancelled => "CANCELLED",
            SessionState::Failed => "FAILED",
        }
    }
}

impl From<PipelineStep> for SessionState {
    fn from(step: PipelineStep) -> Self {
        match step {
            PipelineStep::LoadingData => SessionState::LoadingData,
            PipelineStep::BuildingInstances => SessionState::BuildingInstances,
            PipelineStep::Labelling => SessionState::Labelling,
            PipelineStep::Training => SessionState::Training,
        }
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: SessionState,
    pub new_state: SessionState,
    pub transitioned_at: DateTime<Utc>,
}

/// Log panel entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub severity: LogSeverity,
    /// Entity display name, if the entry concerns one entity
    pub entity: Option<String>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// Step progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionProgress {
    /// Percentage of the current step (0 - 100)
    pub percent: u8,
    /// Current operation description
    pub current_operation: String,
}

impl Default for SessionProgress {
    fn default() -> Self {
        Self {
            percent: 0,
            current_operation: String::from("Initializing..."),
        }
    }
}

/// One pipeline run over a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentSession {
    pub session_id: Uuid,
    pub project: String,
    pub state: SessionState,
    pub progress: SessionProgress,
    pub log: Vec<LogEntry>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl AssessmentSession {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            project: project.into(),
            state: SessionState::Created,
            progress: SessionProgress::default(),
            log: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: SessionState) -> StateTransition {
        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if self.is_terminal() {
            self.ended_at = Some(Utc::now());
        }

        transition
    }

    /// Update progress of the current step
    pub fn update_progress(&mut self, percent: u8, operation: impl Into<String>) {
        self.progress.percent = percent.min(100);
        self.progress.current_operation = operation.into();
    }

    /// Append a log entry
    pub fn push_log(&mut self, severity: LogSeverity, entity: Option<String>, message: String) {
        self.log.push(LogEntry {
            severity,
            entity,
            message,
            occurred_at: Utc::now(),
        });
    }

    pub fn count_by_severity(&self, severity: LogSeverity) -> usize {
        self.log.iter().filter(|e| e.severity == severity).count()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            SessionState::Completed | SessionState::Cancelled | SessionState::Failed
        )
    }

    /// Elapsed wall time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as u64
    }
}

/// Percentage helper for per-entity loops
pub fn percent_of(done: usize, total: usize) -> u8 {
    if total == 0 {
        100
    } else {
        ((done * 100) / total).min(100) as u8
    }
}
