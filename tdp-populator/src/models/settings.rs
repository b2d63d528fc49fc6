//! Run settings parsed from the configuration payload
//!
//! `ImportSettings` can only be obtained through the validating constructors
//! in this module, so a document count above [`MAX_DOCUMENTS`] is never observed.

use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::error;

use crate::error::{PopulateError, Result};

/// Upper bound on generated documents per run
pub const MAX_DOCUMENTS: usize = 20_000;

/// Wire shape of the configuration payload
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SettingsPayload {
    relativity_username: String,
    relativity_password: String,
    relativity_library_folder: String,
    number_of_documents: u64,
    import_images_with_documents: bool,
    import_production_images_with_documents: bool,
}

/// Credentials for the import engine connection
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validated, immutable run settings
#[derive(Clone)]
pub struct ImportSettings {
    credentials: Credentials,
    library_folder: String,
    document_count: usize,
    import_images: bool,
    import_production_images: bool,
}

impl ImportSettings {
    /// Parse settings from a JSON payload
    ///
    /// Every field is required. `NumberOfDocuments` is clamped to [`MAX_DOCUMENTS`];
    /// no other field is transformed.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let payload: SettingsPayload = serde_json::from_slice(bytes).map_err(|e| {
            error!(error = %e, "Error parsing settings configuration");
            PopulateError::SettingsParse(e)
        })?;
        Ok(Self::from_payload(payload))
    }

    /// Parse settings from a reader holding the JSON payload
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let payload: SettingsPayload = serde_json::from_reader(reader).map_err(|e| {
            error!(error = %e, "Error parsing settings configuration");
            PopulateError::SettingsParse(e)
        })?;
        Ok(Self::from_payload(payload))
    }

    /// Parse settings from a downloaded or local settings file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "Settings file cannot be opened");
            PopulateError::Io(e)
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    fn from_payload(payload: SettingsPayload) -> Self {
        let requested = payload.number_of_documents;
        let document_count = usize::try_from(requested)
            .unwrap_or(usize::MAX)
            .min(MAX_DOCUMENTS);

        if document_count as u64 != requested {
            tracing::warn!(
                requested,
                limit = MAX_DOCUMENTS,
                "Requested document count exceeds limit, clamping"
            );
        }

        Self {
            credentials: Credentials {
                username: payload.relativity_username,
                password: payload.relativity_password,
            },
            library_folder: payload.relativity_library_folder,
            document_count,
            import_images: payload.import_images_with_documents,
            import_production_images: payload.import_production_images_with_documents,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub fn password(&self) -> &str {
        &self.credentials.password
    }

    /// Library folder holding the import engine dependencies, as configured
    pub fn library_folder(&self) -> &str {
        &self.library_folder
    }

    /// Number of documents to generate, never above [`MAX_DOCUMENTS`]
    pub fn document_count(&self) -> usize {
        self.document_count
    }

    pub fn import_images(&self) -> bool {
        self.import_images
    }

    pub fn import_production_images(&self) -> bool {
        self.import_production_images
    }
}

impl std::fmt::Debug for ImportSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportSettings")
            .field("credentials", &self.credentials)
            .field("library_folder", &self.library_folder)
            .field("document_count", &self.document_count)
            .field("import_images", &self.import_images)
            .field("import_production_images", &self.import_production_images)
            .finish()
    }
}
