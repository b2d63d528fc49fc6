//! Job builders for the four import stages
//!
//! Column names and fixed settings are what the job engine expects for each
//! import kind; only the identifiers, field names and sample paths vary.

use chrono::Utc;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::models::{CellValue, Column, ImportJob, JobKind, JobSettings, JobTable, OverwriteMode};
use crate::platform::{ArtifactType, IdentityField};

pub const NATIVE_FILE_COLUMN: &str = "Native File";
pub const PARENT_DOCUMENT_COLUMN: &str = "Parent Document ID";
pub const BATES_COLUMN: &str = "Bates";
pub const IMAGE_FILE_COLUMN: &str = "File";
pub const IMAGE_DOCUMENT_IDENTIFIER_FIELD: &str = "Control Number";
pub const PRODUCTION_DOCUMENT_COLUMN: &str = "Doc";
pub const PRODUCTION_FILE_COLUMN: &str = "FileLoc";

pub const PRODUCTION_SET_NAME_COLUMN: &str = "Name";
const PRODUCTION_BRANDING_FONT_SIZE: i64 = 10;
const PRODUCTION_BATES_PREFIX: &str = "iapiT";
const PRODUCTION_START_NUMBER: i64 = 1;

pub const NATIVE_SAMPLE_FILE: &str = "native.htm";
pub const IMAGE_SAMPLE_FILE: &str = "Sample.tif";
pub const PRODUCTION_SAMPLE_FILE: &str = "Prod.tif";

/// Sample content files in the execution directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFiles {
    pub native: PathBuf,
    pub image: PathBuf,
    pub production_image: PathBuf,
}

impl SampleFiles {
    pub fn in_dir(execution_dir: &Path) -> Self {
        Self {
            native: execution_dir.join(NATIVE_SAMPLE_FILE),
            image: execution_dir.join(IMAGE_SAMPLE_FILE),
            production_image: execution_dir.join(PRODUCTION_SAMPLE_FILE),
        }
    }
}

/// Record identifiers generated once per run
///
/// The same identifiers key the document, image and production rows, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierSet {
    ids: Vec<String>,
}

impl IdentifierSet {
    pub fn generate(count: usize) -> Self {
        Self {
            ids: (0..count).map(|_| Uuid::new_v4().to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

fn path_cell(path: &Path) -> CellValue {
    CellValue::Text(path.to_string_lossy().into_owned())
}

/// Documents with native files, one row per identifier
pub fn documents_job(
    workspace_id: i64,
    field: &IdentityField,
    ids: &IdentifierSet,
    native_file: &Path,
) -> ImportJob {
    let mut table = JobTable::new(vec![
        Column::text(field.name.as_str()),
        Column::text(NATIVE_FILE_COLUMN),
        Column::text(PARENT_DOCUMENT_COLUMN),
    ]);
    for id in ids.iter() {
        table.push_row(vec![id.into(), path_cell(native_file), "".into()]);
    }

    let mut settings = JobSettings::new(workspace_id, field.artifact_id, OverwriteMode::Append);
    settings.selected_identifier_field = Some(field.name.clone());
    settings.native_file_path_field = Some(NATIVE_FILE_COLUMN.to_string());
    settings.parent_object_id_field = Some(PARENT_DOCUMENT_COLUMN.to_string());
    settings.copy_files = true;

    ImportJob {
        kind: JobKind::NativeDocuments,
        settings,
        table,
    }
}

/// One image per existing document
pub fn images_job(
    workspace_id: i64,
    field: &IdentityField,
    ids: &IdentifierSet,
    image_file: &Path,
) -> ImportJob {
    let mut table = JobTable::new(vec![
        Column::text(field.name.as_str()),
        Column::text(BATES_COLUMN),
        Column::text(IMAGE_FILE_COLUMN),
    ]);
    for id in ids.iter() {
        table.push_row(vec![id.into(), id.into(), path_cell(image_file)]);
    }

    let mut settings = JobSettings::new(workspace_id, field.artifact_id, OverwriteMode::Overlay);
    settings.bates_number_field = Some(BATES_COLUMN.to_string());
    settings.document_identifier_field = Some(IMAGE_DOCUMENT_IDENTIFIER_FIELD.to_string());
    settings.file_location_field = Some(IMAGE_FILE_COLUMN.to_string());
    settings.copy_files = true;
    settings.auto_number_images = false;

    ImportJob {
        kind: JobKind::Images,
        settings,
        table,
    }
}

/// Single-row object import creating a production set named `name`
pub fn production_set_job(workspace_id: i64, field: &IdentityField, name: &str) -> ImportJob {
    let mut table = JobTable::new(vec![
        Column::text(PRODUCTION_SET_NAME_COLUMN),
        Column::integer("Branding Font Size"),
        Column::date_time("Date Produced"),
        Column::boolean("Scale Branding Font for Viewer"),
        Column::text("Prefix"),
        Column::integer("Start Number"),
        Column::boolean("Copy Production On Workspace Create"),
    ]);
    table.push_row(vec![
        name.into(),
        CellValue::Integer(PRODUCTION_BRANDING_FONT_SIZE),
        CellValue::DateTime(Utc::now()),
        CellValue::Boolean(true),
        PRODUCTION_BATES_PREFIX.into(),
        CellValue::Integer(PRODUCTION_START_NUMBER),
        CellValue::Boolean(true),
    ]);

    let mut settings = JobSettings::new(workspace_id, field.artifact_id, OverwriteMode::Append);
    settings.selected_identifier_field = Some(field.name.clone());

    ImportJob {
        kind: JobKind::ProductionSet {
            artifact_type_id: ArtifactType::Production.type_id(),
        },
        settings,
        table,
    }
}

/// Produced images for every identifier, into an existing production set
pub fn production_job(
    workspace_id: i64,
    document_field: &IdentityField,
    production_set_id: i64,
    ids: &IdentifierSet,
    production_image: &Path,
) -> ImportJob {
    let mut table = JobTable::new(vec![
        Column::text(BATES_COLUMN),
        Column::text(PRODUCTION_DOCUMENT_COLUMN),
        Column::text(PRODUCTION_FILE_COLUMN),
    ]);
    for id in ids.iter() {
        table.push_row(vec![id.into(), id.into(), path_cell(production_image)]);
    }

    let mut settings =
        JobSettings::new(workspace_id, document_field.artifact_id, OverwriteMode::Overlay);
    settings.bates_number_field = Some(BATES_COLUMN.to_string());
    settings.document_identifier_field = Some(PRODUCTION_DOCUMENT_COLUMN.to_string());
    settings.file_location_field = Some(PRODUCTION_FILE_COLUMN.to_string());
    settings.copy_files = true;
    settings.auto_number_images = false;

    ImportJob {
        kind: JobKind::Production { production_set_id },
        settings,
        table,
    }
}
