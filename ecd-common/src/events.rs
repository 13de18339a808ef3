//! Event types and EventBus for pipeline progress notification
//!
//! Each pipeline step reports discrete progress percentages and log entries
//! through the bus. The channel is notification-only: nothing listening on
//! it can pause or cancel a running step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// The four sequential pipeline steps (one per wizard panel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStep {
    /// Observable loading and model reference validation
    LoadingData,
    /// Instance matrices, normalization, instance files
    BuildingInstances,
    /// Label presence check, extraction or clustering
    Labelling,
    /// Classifier training and performance reports
    Training,
}

impl PipelineStep {
    /// Steps in execution order
    pub const ALL: [PipelineStep; 4] = [
        PipelineStep::LoadingData,
        PipelineStep::BuildingInstances,
        PipelineStep::Labelling,
        PipelineStep::Training,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::LoadingData => "LOADING_DATA",
            PipelineStep::BuildingInstances => "BUILDING_INSTANCES",
            PipelineStep::Labelling => "LABELLING",
            PipelineStep::Training => "TRAINING",
        }
    }

    /// 1-based position in the wizard
    pub fn number(&self) -> u8 {
        match self {
            PipelineStep::LoadingData => 1,
            PipelineStep::BuildingInstances => 2,
            PipelineStep::Labelling => 3,
            PipelineStep::Training => 4,
        }
    }
}

/// Severity of a session log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogSeverity {
    Info,
    Warning,
    Error,
}

/// Pipeline events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// A run started
    SessionStarted {
        session_id: Uuid,
        project: String,
        timestamp: DateTime<Utc>,
    },

    /// A step's worker started
    StepStarted {
        session_id: Uuid,
        step: PipelineStep,
        timestamp: DateTime<Utc>,
    },

    /// Discrete progress inside a step
    StepProgress {
        session_id: Uuid,
        step: PipelineStep,
        /// 0-100
        percent: u8,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A step's worker signalled completion
    StepCompleted {
        session_id: Uuid,
        step: PipelineStep,
        timestamp: DateTime<Utc>,
    },

    /// Log panel entry
    LogEntry {
        session_id: Uuid,
        severity: LogSeverity,
        entity: Option<String>,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A run reached a terminal state
    SessionCompleted {
        session_id: Uuid,
        /// Terminal state name (COMPLETED, CANCELLED, FAILED)
        state: String,
        trained: usize,
        failed: usize,
        skipped: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// Event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::SessionStarted { .. } => "SessionStarted",
            PipelineEvent::StepStarted { .. } => "StepStarted",
            PipelineEvent::StepProgress { .. } => "StepProgress",
            PipelineEvent::StepCompleted { .. } => "StepCompleted",
            PipelineEvent::LogEntry { .. } => "LogEntry",
            PipelineEvent::SessionCompleted { .. } => "SessionCompleted",
        }
    }
}

// ============================================================================
// EventBus Implementation
// ============================================================================

/// Broadcast channel for pipeline events
///
/// Wraps `tokio::sync::broadcast`: slow subscribers lag and lose old events
/// rather than blocking the pipeline. Cloning shares the same channel, so a
/// clone can be moved into a blocking worker.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use ecd_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PipelineEvent,
    ) -> Result<usize, broadcast::error::SendError<PipelineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
