//! Post-install population run
//!
//! Fetches the settings resource from the platform, prepares the native
//! dependencies, connects the job engine and runs the import pipeline. The
//! platform session is held for the whole run and released on every exit path.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tdp_common::config::ConfigResolver;
use tdp_common::events::EventBus;
use tracing::{debug, error, info};

use crate::error::{PopulateError, Result};
use crate::models::{ImportSettings, PopulationRun, RunResult};
use crate::platform::{ImportEngine, ImportEngineFactory, PlatformSession, SessionGuard};
use crate::services::dependency_resolver::{library_folder_path, DependencyResolver};
use crate::services::fetcher::{
    config_download_path, with_protocol_fallback, ProtocolTemplate, ResilientFetcher,
};
use crate::services::import_orchestrator::{ImportOrchestrator, SampleFiles};

/// Download and parse the settings resource file
pub async fn retrieve_settings(
    session: &dyn PlatformSession,
    fetcher: &ResilientFetcher,
    config_resource_name: &str,
) -> Result<ImportSettings> {
    let queries = session.queries();

    let artifact_id = queries
        .resource_file_id(config_resource_name)
        .await?
        .ok_or_else(|| PopulateError::ResourceFileNotFound(config_resource_name.to_string()))?;

    let token = queries
        .request_auth_token()
        .await?
        .ok_or(PopulateError::AuthToken)?;

    let template = ProtocolTemplate::resource_download(session.endpoint_host(), artifact_id, &token);
    let destination = config_download_path();
    fetcher.fetch_with_fallback(&template, &destination).await?;

    let settings = ImportSettings::from_file(&destination);

    if let Err(e) = tokio::fs::remove_file(&destination).await {
        debug!(path = %destination.display(), error = %e, "Downloaded settings file not removed");
    }

    settings
}

/// Per-run parameters of a post-install run
#[derive(Debug, Clone, Serialize)]
pub struct RunOptions {
    pub workspace_id: i64,
    /// Staging target for dependencies; also holds the sample content files
    pub execution_dir: PathBuf,
    pub config_resource_name: String,
}

impl RunOptions {
    /// Resolve run options from bootstrap configuration and CLI overrides
    ///
    /// The workspace id has no default; without one the run cannot start.
    pub fn resolve(
        config: &ConfigResolver,
        workspace_id: Option<i64>,
        execution_dir: Option<&Path>,
    ) -> Result<Self> {
        let workspace_id = config.workspace_id(workspace_id).ok_or_else(|| {
            PopulateError::Configuration(
                "Workspace id not configured (--workspace-id or workspace_id in TOML)".to_string(),
            )
        })?;

        Ok(Self {
            workspace_id,
            execution_dir: config.execution_dir(execution_dir),
            config_resource_name: config.config_resource_name(),
        })
    }
}

/// Post-install population of one workspace
pub struct PostInstallRun {
    session: Arc<dyn PlatformSession>,
    fetcher: ResilientFetcher,
    resolver: DependencyResolver,
    engine_factory: Arc<dyn ImportEngineFactory>,
    events: EventBus,
    options: RunOptions,
}

impl PostInstallRun {
    pub fn new(
        session: Arc<dyn PlatformSession>,
        fetcher: ResilientFetcher,
        resolver: DependencyResolver,
        engine_factory: Arc<dyn ImportEngineFactory>,
        events: EventBus,
        options: RunOptions,
    ) -> Self {
        Self {
            session,
            fetcher,
            resolver,
            engine_factory,
            events,
            options,
        }
    }

    /// Run the whole post-install sequence
    ///
    /// Never fails; the outcome and full error chain are in the returned result.
    pub async fn execute(&self) -> RunResult {
        let guard = SessionGuard::new(Arc::clone(&self.session));

        match self.run(&guard).await {
            Ok(run) => {
                info!(
                    run_id = %run.run_id,
                    workspace_id = self.options.workspace_id,
                    "Test data population complete"
                );
                RunResult::success()
            }
            Err(e) => {
                error!(
                    workspace_id = self.options.workspace_id,
                    error = %e,
                    "Test data population failed"
                );
                RunResult::failure(e)
            }
        }
    }

    async fn run(&self, guard: &SessionGuard) -> Result<PopulationRun> {
        let session = guard.session();

        let settings =
            retrieve_settings(session, &self.fetcher, &self.options.config_resource_name).await?;

        if settings.library_folder().trim().is_empty() {
            return Err(PopulateError::Configuration(
                "Library folder is not set in the settings configuration".to_string(),
            ));
        }

        self.resolver
            .prepare(
                &library_folder_path(settings.library_folder()),
                &self.options.execution_dir,
            )
            .await?;

        let engine = self.connect_engine(session.endpoint_host(), &settings).await?;

        let orchestrator = ImportOrchestrator::new(
            session.queries(),
            engine,
            self.events.clone(),
            self.options.workspace_id,
            settings,
            SampleFiles::in_dir(&self.options.execution_dir),
        );
        orchestrator.populate().await
    }

    async fn connect_engine(
        &self,
        host: &str,
        settings: &ImportSettings,
    ) -> Result<Arc<dyn ImportEngine>> {
        let template = ProtocolTemplate::web_api(host);
        let factory = &self.engine_factory;
        let credentials = settings.credentials();

        with_protocol_fallback(&template, |url| async move {
            debug!(url = %url, "Connecting import engine");
            factory.connect(credentials, &url).await
        })
        .await
    }
}
