//! Test Helper Utilities
//!
//! Fake platform collaborators and a local file server for testing tdp-populator

#![allow(dead_code)]

use async_trait::async_trait;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tdp_populator::error::{PopulateError, Result};
use tdp_populator::models::{Credentials, ImportJob, ImportSettings, JobKind, JobReport};
use tdp_populator::platform::{
    ArtifactQueries, ArtifactType, IdentityField, ImportEngine, ImportEngineFactory,
    PlatformSession, ProgressSink,
};

pub const WORKSPACE_ID: i64 = 1017;
pub const PRODUCTION_SET_ID: i64 = 1040222;

/// Settings parsed from a payload built with the given values
pub fn settings(documents: u64, images: bool, production: bool, library_folder: &str) -> ImportSettings {
    ImportSettings::parse(settings_json(documents, images, production, library_folder).as_bytes())
        .unwrap()
}

pub fn settings_json(documents: u64, images: bool, production: bool, library_folder: &str) -> String {
    serde_json::json!({
        "RelativityUsername": "populator@example.com",
        "RelativityPassword": "s3cret",
        "RelativityLibraryFolder": library_folder,
        "NumberOfDocuments": documents,
        "ImportImagesWithDocuments": images,
        "ImportProductionImagesWithDocuments": production,
    })
    .to_string()
}

/// Record-query API with fixed answers
pub struct FakeQueries {
    pub document_field: Option<IdentityField>,
    pub production_field: Option<IdentityField>,
    pub production_set_id: Option<i64>,
    pub resource_file_id: Option<i64>,
    pub auth_token: Option<String>,
    pub production_set_lookups: Mutex<Vec<String>>,
}

impl Default for FakeQueries {
    fn default() -> Self {
        Self {
            document_field: Some(IdentityField {
                artifact_id: 1003667,
                name: "Control Number".to_string(),
            }),
            production_field: Some(IdentityField {
                artifact_id: 1035000,
                name: "Name".to_string(),
            }),
            production_set_id: Some(PRODUCTION_SET_ID),
            resource_file_id: Some(1234567),
            auth_token: Some("token-abc".to_string()),
            production_set_lookups: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ArtifactQueries for FakeQueries {
    async fn identity_field(
        &self,
        _workspace_id: i64,
        artifact_type: ArtifactType,
    ) -> Result<Option<IdentityField>> {
        Ok(match artifact_type {
            ArtifactType::Document => self.document_field.clone(),
            ArtifactType::Production => self.production_field.clone(),
        })
    }

    async fn production_set_id(&self, _workspace_id: i64, name: &str) -> Result<Option<i64>> {
        self.production_set_lookups.lock().unwrap().push(name.to_string());
        Ok(self.production_set_id)
    }

    async fn resource_file_id(&self, _file_name: &str) -> Result<Option<i64>> {
        Ok(self.resource_file_id)
    }

    async fn request_auth_token(&self) -> Result<Option<String>> {
        Ok(self.auth_token.clone())
    }
}

/// Job engine that records every submitted job
///
/// Each job reports one progress message, then completes with all rows
/// processed unless a fatal error is configured for its position.
#[derive(Default)]
pub struct RecordingEngine {
    pub jobs: Mutex<Vec<ImportJob>>,
    pub fatal_at: Option<(usize, String)>,
    pub error_rows: usize,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fatal_at(index: usize, message: &str) -> Self {
        Self {
            fatal_at: Some((index, message.to_string())),
            ..Self::default()
        }
    }

    pub fn kinds(&self) -> Vec<JobKind> {
        self.jobs.lock().unwrap().iter().map(|job| job.kind).collect()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}

#[async_trait]
impl ImportEngine for RecordingEngine {
    async fn execute(&self, job: ImportJob, progress: &ProgressSink) -> JobReport {
        let rows = job.row_count();
        let index = {
            let mut jobs = self.jobs.lock().unwrap();
            jobs.push(job);
            jobs.len() - 1
        };

        progress.report(format!("processed {rows} rows"));

        match &self.fatal_at {
            Some((at, message)) if *at == index => JobReport::fatal(message.clone()),
            _ => JobReport::completed(rows, self.error_rows.min(rows)),
        }
    }
}

/// Session that counts releases
pub struct FakeSession {
    pub host: String,
    pub queries: Arc<FakeQueries>,
    pub releases: AtomicUsize,
}

impl FakeSession {
    pub fn new(host: impl Into<String>, queries: FakeQueries) -> Self {
        Self {
            host: host.into(),
            queries: Arc::new(queries),
            releases: AtomicUsize::new(0),
        }
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl PlatformSession for FakeSession {
    fn endpoint_host(&self) -> &str {
        &self.host
    }

    fn queries(&self) -> Arc<dyn ArtifactQueries> {
        self.queries.clone()
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Engine factory that only accepts insecure URLs when `reject_secure` is set
pub struct FakeEngineFactory {
    pub engine: Arc<RecordingEngine>,
    pub reject_secure: bool,
    pub attempts: Mutex<Vec<String>>,
}

impl FakeEngineFactory {
    pub fn new(engine: Arc<RecordingEngine>) -> Self {
        Self {
            engine,
            reject_secure: false,
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempted_urls(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImportEngineFactory for FakeEngineFactory {
    async fn connect(
        &self,
        _credentials: &Credentials,
        web_api_url: &str,
    ) -> Result<Arc<dyn ImportEngine>> {
        self.attempts.lock().unwrap().push(web_api_url.to_string());

        if self.reject_secure && web_api_url.starts_with("https://") {
            return Err(PopulateError::EngineUnavailable {
                url: web_api_url.to_string(),
                reason: "TLS not configured".to_string(),
            });
        }
        Ok(self.engine.clone())
    }
}

/// Serve `body` at the resource download path on a plain HTTP listener
///
/// Returns the `host:port` to use as the platform host.
pub async fn spawn_download_server(body: impl Into<String>) -> String {
    let body: String = body.into();
    let app = Router::new().route(
        "/Relativity.Distributed/Download.aspx",
        get(move || async move { body }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr.to_string()
}

/// A `host:port` with nothing listening on it
pub async fn unused_host() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

/// Create every file of `files` under `dir`, including subdirectories
pub fn create_files<'a>(dir: &Path, files: impl IntoIterator<Item = &'a str>) {
    for file in files {
        let path = dir.join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, format!("contents of {file}")).unwrap();
    }
}
