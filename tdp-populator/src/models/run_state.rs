//! Population pipeline state machine
//!
//! START → RESOLVE_DOCUMENT_FIELD → IMPORT_DOCUMENTS → [IMPORT_IMAGES]
//! → [CREATE_PRODUCTION_SET → RESOLVE_PRODUCTION_SET_ID → IMPORT_PRODUCTION] → DONE
//!
//! FAILED is reachable from every non-terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tdp_common::events::StageName;
use uuid::Uuid;

use super::outcome::StageOutcome;

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Start,
    ResolveDocumentField,
    ImportDocuments,
    ImportImages,
    CreateProductionSet,
    ResolveProductionSetId,
    ImportProduction,
    /// Every attempted stage completed
    Done,
    /// A stage hit a fatal condition
    Failed,
}

impl PipelineState {
    /// Stage executed while in this state
    pub fn stage(self) -> Option<StageName> {
        match self {
            PipelineState::ResolveDocumentField => Some(StageName::ResolveDocumentField),
            PipelineState::ImportDocuments => Some(StageName::ImportDocuments),
            PipelineState::ImportImages => Some(StageName::ImportImages),
            PipelineState::CreateProductionSet => Some(StageName::CreateProductionSet),
            PipelineState::ResolveProductionSetId => Some(StageName::ResolveProductionSetId),
            PipelineState::ImportProduction => Some(StageName::ImportProduction),
            PipelineState::Start | PipelineState::Done | PipelineState::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;

        if next == Failed {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Start, ResolveDocumentField)
                | (ResolveDocumentField, ImportDocuments)
                | (ImportDocuments, ImportImages | CreateProductionSet | Done)
                | (ImportImages, CreateProductionSet | Done)
                | (CreateProductionSet, ResolveProductionSetId)
                | (ResolveProductionSetId, ImportProduction)
                | (ImportProduction, Done)
        )
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: Uuid,
    pub old_state: PipelineState,
    pub new_state: PipelineState,
    pub transitioned_at: DateTime<Utc>,
}

/// In-memory record of one population run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationRun {
    pub run_id: Uuid,
    pub workspace_id: i64,
    pub state: PipelineState,
    /// Outcomes of job-submitting stages, in execution order
    pub outcomes: Vec<StageOutcome>,
    /// Stage that was running when the run failed
    pub failed_stage: Option<StageName>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl PopulationRun {
    pub fn new(workspace_id: i64) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            workspace_id,
            state: PipelineState::Start,
            outcomes: Vec::new(),
            failed_stage: None,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: PipelineState) -> StateTransition {
        debug_assert!(
            self.state.can_transition_to(new_state),
            "illegal transition {:?} -> {:?}",
            self.state,
            new_state
        );

        let transition = StateTransition {
            run_id: self.run_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }

        transition
    }

    /// Move to FAILED, remembering the stage that was running
    pub fn fail(&mut self, error: String) -> StateTransition {
        self.failed_stage = self.state.stage();
        self.error = Some(error);
        self.transition_to(PipelineState::Failed)
    }

    pub fn record_outcome(&mut self, outcome: StageOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn is_success(&self) -> bool {
        self.state == PipelineState::Done
    }

    /// Total non-fatal row errors across stages
    pub fn total_error_rows(&self) -> usize {
        self.outcomes.iter().map(|o| o.error_row_count).sum()
    }
}
