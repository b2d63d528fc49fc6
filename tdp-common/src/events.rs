//! Event types for the populator run
//!
//! Progress of a population run is published as [`PopulatorEvent`]s on an
//! [`EventBus`]. The orchestrator never registers callbacks on the job engine;
//! engine progress is forwarded here instead, always ahead of the matching
//! `StageCompleted` event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pipeline stage names as reported in events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageName {
    ResolveDocumentField,
    ImportDocuments,
    ImportImages,
    CreateProductionSet,
    ResolveProductionSetId,
    ImportProduction,
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StageName::ResolveDocumentField => "resolve document field",
            StageName::ImportDocuments => "import documents",
            StageName::ImportImages => "import images",
            StageName::CreateProductionSet => "create production set",
            StageName::ResolveProductionSetId => "resolve production set id",
            StageName::ImportProduction => "import production",
        };
        f.write_str(name)
    }
}

/// Populator event types
///
/// Events are broadcast via EventBus and can be serialized for external consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PopulatorEvent {
    /// Orchestration started
    RunStarted {
        run_id: Uuid,
        workspace_id: i64,
        document_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A pipeline stage began
    StageStarted {
        run_id: Uuid,
        stage: StageName,
        timestamp: DateTime<Utc>,
    },

    /// Progress message reported by the job engine
    JobProgress {
        run_id: Uuid,
        stage: StageName,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A job-submitting stage finished without a fatal error
    StageCompleted {
        run_id: Uuid,
        stage: StageName,
        rows_submitted: usize,
        error_row_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Every attempted stage completed
    RunCompleted {
        run_id: Uuid,
        stages_completed: usize,
        timestamp: DateTime<Utc>,
    },

    /// The run moved to the failed state
    RunFailed {
        run_id: Uuid,
        /// Stage that failed, None if the run failed before any stage
        stage: Option<StageName>,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for [`PopulatorEvent`]s
///
/// Cloning the bus shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PopulatorEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered before slow receivers start lagging.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PopulatorEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PopulatorEvent,
    ) -> Result<usize, broadcast::error::SendError<PopulatorEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PopulatorEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
