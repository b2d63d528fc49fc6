//! Error types for tdp-populator
//!
//! Configuration and validation errors are raised before any import job is
//! submitted. Per-row import errors are never raised; they are counted in the
//! stage outcome instead.

use std::path::PathBuf;
use thiserror::Error;

use crate::platform::ArtifactType;

/// Populator error type
#[derive(Debug, Error)]
pub enum PopulateError {
    /// Library folder blank or not accessible
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Manifest files absent from the library folder
    #[error(
        "The following files are missing from the library folder {}: {}",
        .folder.display(),
        .files.join(", ")
    )]
    MissingDependency { folder: PathBuf, files: Vec<String> },

    /// Manifest files that could not be staged and have no earlier staged copy
    #[error("Unable to stage dependencies into {}: {}", .destination.display(), .files.join(", "))]
    Staging { destination: PathBuf, files: Vec<String> },

    /// Settings payload malformed or incomplete
    #[error("Error parsing settings configuration")]
    SettingsParse(#[source] serde_json::Error),

    /// Transport failure while downloading a resource
    #[error("Unable to download file: {url}")]
    Download {
        url: String,
        #[source]
        source: DownloadFailure,
    },

    /// Settings resource file not registered on the platform
    #[error("Unable to find config file in resources: {0}")]
    ResourceFileNotFound(String),

    /// Session authentication token unavailable
    #[error("Unable to generate auth token")]
    AuthToken,

    /// Identifying field missing for a record type
    #[error("Unable to find {0} identifying field")]
    FieldResolution(ArtifactType),

    /// Production set lookup by name came back empty
    #[error("Unable to find production set: {0}")]
    ProductionSetNotFound(String),

    /// Job engine reported a fatal condition
    #[error("Import job failed: {0}")]
    ImportJobFatal(String),

    /// Job engine could not be reached over either protocol
    #[error("Unable to connect to import engine at {url}: {reason}")]
    EngineUnavailable { url: String, reason: String },

    /// Platform query failed
    #[error("Platform error: {0}")]
    Platform(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// tdp-common error
    #[error("Common error: {0}")]
    Common(#[from] tdp_common::Error),
}

/// Underlying cause of a failed download
#[derive(Debug, Error)]
pub enum DownloadFailure {
    /// Request, status or body stream error
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Destination file could not be written
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for populator operations
pub type Result<T> = std::result::Result<T, PopulateError>;
