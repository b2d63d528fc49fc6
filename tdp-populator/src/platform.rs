//! Review platform collaborators
//!
//! The record-query API, the bulk-import job engine and the session that owns
//! them live outside this crate. These traits are the seams the populator is
//! written against; hosts supply the implementations.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tdp_common::events::{EventBus, PopulatorEvent, StageName};
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Credentials, ImportJob, JobReport};

/// Record types the populator queries identity fields for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactType {
    Document,
    Production,
}

impl ArtifactType {
    /// Platform artifact type id
    pub fn type_id(self) -> i32 {
        match self {
            ArtifactType::Document => 10,
            ArtifactType::Production => 17,
        }
    }
}

impl std::fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactType::Document => f.write_str("document"),
            ArtifactType::Production => f.write_str("production"),
        }
    }
}

/// Identifying field of a record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityField {
    pub artifact_id: i64,
    pub name: String,
}

/// Record-query API of the review platform
///
/// `Ok(None)` means the query ran and found nothing; `Err` means the query itself failed.
#[async_trait]
pub trait ArtifactQueries: Send + Sync {
    /// Identifying field of `artifact_type` in the workspace
    async fn identity_field(
        &self,
        workspace_id: i64,
        artifact_type: ArtifactType,
    ) -> Result<Option<IdentityField>>;

    /// Artifact id of the production set named `name`
    async fn production_set_id(&self, workspace_id: i64, name: &str) -> Result<Option<i64>>;

    /// Artifact id of an instance-level resource file
    async fn resource_file_id(&self, file_name: &str) -> Result<Option<i64>>;

    /// Authentication token for resource downloads
    async fn request_auth_token(&self) -> Result<Option<String>>;
}

/// Bulk-import job engine
///
/// `execute` blocks the caller until the job completes or hits a fatal
/// condition. Progress messages go to `progress` before the report is returned.
#[async_trait]
pub trait ImportEngine: Send + Sync {
    async fn execute(&self, job: ImportJob, progress: &ProgressSink) -> JobReport;
}

/// Creates job engine connections once dependencies are loaded
#[async_trait]
pub trait ImportEngineFactory: Send + Sync {
    async fn connect(
        &self,
        credentials: &Credentials,
        web_api_url: &str,
    ) -> Result<Arc<dyn ImportEngine>>;
}

/// Open session to the review platform
pub trait PlatformSession: Send + Sync {
    /// Host name of the platform endpoint, without protocol
    fn endpoint_host(&self) -> &str;

    /// Record-query API bound to this session
    fn queries(&self) -> Arc<dyn ArtifactQueries>;

    /// Release the session; called exactly once by [`SessionGuard`]
    fn release(&self);
}

/// Scoped ownership of a platform session
///
/// The session is released when the guard drops, on every exit path.
pub struct SessionGuard {
    session: Arc<dyn PlatformSession>,
}

impl SessionGuard {
    pub fn new(session: Arc<dyn PlatformSession>) -> Self {
        debug!(host = %session.endpoint_host(), "Platform session acquired");
        Self { session }
    }

    pub fn session(&self) -> &dyn PlatformSession {
        self.session.as_ref()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.release();
        debug!(host = %self.session.endpoint_host(), "Platform session released");
    }
}

/// Progress sink handed to the job engine for one stage
///
/// Messages are logged at debug level and forwarded to the event bus.
pub struct ProgressSink {
    bus: EventBus,
    run_id: Uuid,
    stage: StageName,
}

impl ProgressSink {
    pub fn new(bus: EventBus, run_id: Uuid, stage: StageName) -> Self {
        Self { bus, run_id, stage }
    }

    pub fn stage(&self) -> StageName {
        self.stage
    }

    pub fn report(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(run_id = %self.run_id, stage = %self.stage, "{}", message);
        self.bus.emit_lossy(PopulatorEvent::JobProgress {
            run_id: self.run_id,
            stage: self.stage,
            message,
            timestamp: Utc::now(),
        });
    }
}
