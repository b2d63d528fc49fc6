//! Native client-library dependencies
//!
//! Resolves the manifest for the platform version, checks the library folder,
//! stages every manifest file into the execution directory and loads the core
//! files into the process.

pub mod loader;
pub mod manifest;

pub use loader::{DynamicLibraryLoader, LibraryLoader};
pub use manifest::{
    resolve_manifest, DependencyManifest, PlatformVersion, CORE_FILES, MANIFEST_TABLE,
    OUTSIDE_IN_THRESHOLD,
};

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{PopulateError, Result};

/// Outcome of staging one manifest file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Copied,
    /// Destination already holds this file; no copy was made
    SkippedAlreadyPresent,
    Failed { reason: String },
}

/// Outcome of loading one core file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadStatus {
    Loaded,
    Failed { reason: String },
}

/// Per-file staging results, in manifest order
#[derive(Debug, Clone, Default, Serialize)]
pub struct StagingReport {
    pub files: Vec<(String, FileStatus)>,
}

impl StagingReport {
    pub fn count(&self, predicate: impl Fn(&FileStatus) -> bool) -> usize {
        self.files.iter().filter(|(_, status)| predicate(status)).count()
    }

    pub fn failed_files(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|(_, status)| matches!(status, FileStatus::Failed { .. }))
            .map(|(file, _)| file.clone())
            .collect()
    }
}

/// Per-file load results, in core-file order
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub files: Vec<(String, LoadStatus)>,
}

impl LoadReport {
    pub fn failed_files(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|(_, status)| matches!(status, LoadStatus::Failed { .. }))
            .map(|(file, _)| file.clone())
            .collect()
    }

    pub fn all_loaded(&self) -> bool {
        self.files.iter().all(|(_, s)| *s == LoadStatus::Loaded)
    }
}

/// Everything `prepare` did, for reporting
#[derive(Debug, Clone, Serialize)]
pub struct PreparedDependencies {
    pub version: PlatformVersion,
    pub manifest: DependencyManifest,
    pub staging: StagingReport,
    pub loading: LoadReport,
}

/// Dependency resolver for one platform version
pub struct DependencyResolver {
    version: PlatformVersion,
    loader: Arc<dyn LibraryLoader>,
}

impl DependencyResolver {
    pub fn new(version: PlatformVersion, loader: Arc<dyn LibraryLoader>) -> Self {
        Self { version, loader }
    }

    pub fn version(&self) -> PlatformVersion {
        self.version
    }

    pub fn manifest(&self) -> DependencyManifest {
        resolve_manifest(self.version)
    }

    /// Check that `source_dir` exists and holds every manifest file
    pub fn validate(&self, source_dir: &Path, manifest: &DependencyManifest) -> Result<()> {
        if source_dir.as_os_str().to_string_lossy().trim().is_empty() {
            return Err(PopulateError::Configuration(
                "Library folder is not set".to_string(),
            ));
        }

        if !source_dir.is_dir() {
            return Err(PopulateError::Configuration(format!(
                "Library folder does not exist: {}",
                source_dir.display()
            )));
        }

        let missing: Vec<String> = manifest
            .all_files()
            .filter(|file| !source_dir.join(file).is_file())
            .map(str::to_string)
            .collect();

        if !missing.is_empty() {
            warn!(
                folder = %source_dir.display(),
                missing = missing.len(),
                "Library folder is incomplete"
            );
            return Err(PopulateError::MissingDependency {
                folder: source_dir.to_path_buf(),
                files: missing,
            });
        }

        debug!(folder = %source_dir.display(), files = manifest.len(), "Library folder validated");
        Ok(())
    }

    /// Copy every manifest file into `dest_dir`, creating subdirectories
    ///
    /// One failing file does not stop the others. A file that failed to copy
    /// but already has a staged copy is reported as skipped; any other failure
    /// fails the stage once every file has been attempted.
    pub async fn stage(
        &self,
        source_dir: &Path,
        dest_dir: &Path,
        manifest: &DependencyManifest,
    ) -> Result<StagingReport> {
        let mut report = StagingReport::default();

        for file in manifest.all_files() {
            let status = stage_file(&source_dir.join(file), &dest_dir.join(file)).await;
            match &status {
                FileStatus::Copied => debug!(file, "Dependency staged"),
                FileStatus::SkippedAlreadyPresent => debug!(file, "Dependency already staged"),
                FileStatus::Failed { reason } => warn!(file, reason = %reason, "Dependency not staged"),
            }
            report.files.push((file.to_string(), status));
        }

        let failed = report.failed_files();
        if !failed.is_empty() {
            return Err(PopulateError::Staging {
                destination: dest_dir.to_path_buf(),
                files: failed,
            });
        }

        info!(
            destination = %dest_dir.display(),
            copied = report.count(|s| *s == FileStatus::Copied),
            skipped = report.count(|s| *s == FileStatus::SkippedAlreadyPresent),
            "Dependencies staged"
        );
        Ok(report)
    }

    /// Load each core file from `dest_dir`
    ///
    /// Each file is read in full first, so an unreadable or empty staged copy
    /// is reported without reaching the linker. Never fails as a whole;
    /// per-file failures are logged and reported.
    pub async fn load(&self, dest_dir: &Path, core_files: &[String]) -> LoadReport {
        let mut report = LoadReport::default();

        for file in core_files {
            let path = dest_dir.join(file);
            let status = match tokio::fs::read(&path).await {
                Ok(image) => match self.loader.load(&path, &image) {
                    Ok(()) => LoadStatus::Loaded,
                    Err(e) => LoadStatus::Failed {
                        reason: e.to_string(),
                    },
                },
                Err(e) => LoadStatus::Failed {
                    reason: e.to_string(),
                },
            };

            if let LoadStatus::Failed { reason } = &status {
                warn!(file = %file, reason = %reason, "Unable to load dependency");
            }
            report.files.push((file.clone(), status));
        }

        report
    }

    /// Resolve, validate, stage and load in one pass
    pub async fn prepare(
        &self,
        library_folder: &Path,
        execution_dir: &Path,
    ) -> Result<PreparedDependencies> {
        let manifest = self.manifest();
        info!(
            version = %self.version,
            files = manifest.len(),
            library_folder = %library_folder.display(),
            "Preparing dependencies"
        );

        self.validate(library_folder, &manifest)?;
        let staging = self.stage(library_folder, execution_dir, &manifest).await?;
        let loading = self.load(execution_dir, &manifest.core_files).await;

        if !loading.all_loaded() {
            warn!(
                failed = ?loading.failed_files(),
                "Some core dependencies did not load; engine connection may fail"
            );
        }

        Ok(PreparedDependencies {
            version: self.version,
            manifest,
            staging,
            loading,
        })
    }
}

async fn stage_file(source: &Path, destination: &Path) -> FileStatus {
    if same_file(source, destination).await {
        return FileStatus::SkippedAlreadyPresent;
    }

    match copy_with_parents(source, destination).await {
        Ok(()) => FileStatus::Copied,
        Err(e) => {
            if tokio::fs::metadata(destination).await.is_ok() {
                debug!(
                    destination = %destination.display(),
                    error = %e,
                    "Copy failed, keeping existing staged file"
                );
                FileStatus::SkippedAlreadyPresent
            } else {
                FileStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

async fn copy_with_parents(source: &Path, destination: &Path) -> std::io::Result<()> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(source, destination).await?;
    Ok(())
}

/// Destination is the source itself or has identical content
async fn same_file(source: &Path, destination: &Path) -> bool {
    if let (Ok(a), Ok(b)) = (
        tokio::fs::canonicalize(source).await,
        tokio::fs::canonicalize(destination).await,
    ) {
        if a == b {
            return true;
        }
    }

    match (file_digest(source).await, file_digest(destination).await) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

async fn file_digest(path: &Path) -> Option<Vec<u8>> {
    let bytes = tokio::fs::read(path).await.ok()?;
    Some(Sha256::digest(&bytes).to_vec())
}

/// Folder a library path string refers to
pub fn library_folder_path(library_folder: &str) -> PathBuf {
    PathBuf::from(library_folder.trim())
}
