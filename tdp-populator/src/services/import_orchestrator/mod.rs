//! Four-stage import pipeline
//!
//! Documents, then optionally images, then optionally a production set and its
//! produced images. Stages run strictly in sequence with one outstanding
//! engine call at a time. The first fatal condition ends the run; nothing
//! already imported is rolled back.

pub mod jobs;

pub use jobs::{IdentifierSet, SampleFiles};

use chrono::Utc;
use std::sync::Arc;
use tdp_common::events::{EventBus, PopulatorEvent, StageName};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{PopulateError, Result};
use crate::models::{ImportJob, ImportSettings, PipelineState, PopulationRun, StageOutcome};
use crate::platform::{ArtifactQueries, ArtifactType, ImportEngine, ProgressSink};

/// Import orchestrator for one workspace
pub struct ImportOrchestrator {
    queries: Arc<dyn ArtifactQueries>,
    engine: Arc<dyn ImportEngine>,
    events: EventBus,
    workspace_id: i64,
    settings: ImportSettings,
    samples: SampleFiles,
}

impl ImportOrchestrator {
    pub fn new(
        queries: Arc<dyn ArtifactQueries>,
        engine: Arc<dyn ImportEngine>,
        events: EventBus,
        workspace_id: i64,
        settings: ImportSettings,
        samples: SampleFiles,
    ) -> Self {
        Self {
            queries,
            engine,
            events,
            workspace_id,
            settings,
            samples,
        }
    }

    /// Run the pipeline to completion or first fatal error
    ///
    /// Returns the run record on success. On failure the run has already been
    /// moved to FAILED and a `RunFailed` event emitted.
    pub async fn populate(&self) -> Result<PopulationRun> {
        let mut run = PopulationRun::new(self.workspace_id);

        info!(
            run_id = %run.run_id,
            workspace_id = self.workspace_id,
            documents = self.settings.document_count(),
            images = self.settings.import_images(),
            production = self.settings.import_production_images(),
            "Starting population run"
        );
        self.events.emit_lossy(PopulatorEvent::RunStarted {
            run_id: run.run_id,
            workspace_id: self.workspace_id,
            document_count: self.settings.document_count(),
            timestamp: Utc::now(),
        });

        match self.execute_stages(&mut run).await {
            Ok(()) => {
                run.transition_to(PipelineState::Done);
                info!(
                    run_id = %run.run_id,
                    stages = run.outcomes.len(),
                    error_rows = run.total_error_rows(),
                    "Population run completed"
                );
                self.events.emit_lossy(PopulatorEvent::RunCompleted {
                    run_id: run.run_id,
                    stages_completed: run.outcomes.len(),
                    timestamp: Utc::now(),
                });
                Ok(run)
            }
            Err(e) => {
                run.fail(e.to_string());
                error!(
                    run_id = %run.run_id,
                    stage = ?run.failed_stage,
                    error = %e,
                    "Population run failed"
                );
                self.events.emit_lossy(PopulatorEvent::RunFailed {
                    run_id: run.run_id,
                    stage: run.failed_stage,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    async fn execute_stages(&self, run: &mut PopulationRun) -> Result<()> {
        self.enter(run, PipelineState::ResolveDocumentField);
        let document_field = self
            .queries
            .identity_field(self.workspace_id, ArtifactType::Document)
            .await?
            .ok_or(PopulateError::FieldResolution(ArtifactType::Document))?;
        debug!(field = %document_field.name, "Document identifying field resolved");

        let ids = IdentifierSet::generate(self.settings.document_count());

        self.enter(run, PipelineState::ImportDocuments);
        let job = jobs::documents_job(self.workspace_id, &document_field, &ids, &self.samples.native);
        self.submit(run, StageName::ImportDocuments, job).await?;

        if self.settings.import_images() {
            self.enter(run, PipelineState::ImportImages);
            let job = jobs::images_job(self.workspace_id, &document_field, &ids, &self.samples.image);
            self.submit(run, StageName::ImportImages, job).await?;
        }

        if self.settings.import_production_images() {
            self.enter(run, PipelineState::CreateProductionSet);
            let production_field = self
                .queries
                .identity_field(self.workspace_id, ArtifactType::Production)
                .await?
                .ok_or(PopulateError::FieldResolution(ArtifactType::Production))?;

            let set_name = Uuid::new_v4().to_string();
            let job = jobs::production_set_job(self.workspace_id, &production_field, &set_name);
            self.submit(run, StageName::CreateProductionSet, job).await?;

            self.enter(run, PipelineState::ResolveProductionSetId);
            let production_set_id = self
                .queries
                .production_set_id(self.workspace_id, &set_name)
                .await?
                .ok_or_else(|| PopulateError::ProductionSetNotFound(set_name.clone()))?;
            debug!(name = %set_name, production_set_id, "Production set resolved");

            self.enter(run, PipelineState::ImportProduction);
            let job = jobs::production_job(
                self.workspace_id,
                &document_field,
                production_set_id,
                &ids,
                &self.samples.production_image,
            );
            self.submit(run, StageName::ImportProduction, job).await?;
        }

        Ok(())
    }

    fn enter(&self, run: &mut PopulationRun, state: PipelineState) {
        run.transition_to(state);
        if let Some(stage) = state.stage() {
            debug!(run_id = %run.run_id, stage = %stage, "Stage started");
            self.events.emit_lossy(PopulatorEvent::StageStarted {
                run_id: run.run_id,
                stage,
                timestamp: Utc::now(),
            });
        }
    }

    /// Submit one job and wait for its report
    async fn submit(&self, run: &mut PopulationRun, stage: StageName, job: ImportJob) -> Result<()> {
        let rows = job.row_count();
        info!(run_id = %run.run_id, stage = %stage, rows, "Submitting import job");

        let progress = ProgressSink::new(self.events.clone(), run.run_id, stage);
        let report = self.engine.execute(job, &progress).await;
        let outcome = StageOutcome::from_report(stage, rows, report);

        if outcome.error_row_count > 0 {
            warn!(
                run_id = %run.run_id,
                stage = %stage,
                error_rows = outcome.error_row_count,
                "Import job completed with row errors"
            );
        }

        run.record_outcome(outcome.clone());
        let outcome = outcome.into_result()?;

        self.events.emit_lossy(PopulatorEvent::StageCompleted {
            run_id: run.run_id,
            stage,
            rows_submitted: outcome.rows_submitted,
            error_row_count: outcome.error_row_count,
            timestamp: Utc::now(),
        });
        Ok(())
    }
}
