//! Import job definitions handed to the job engine
//!
//! A job is a tabular input plus the settings the engine needs to map the
//! columns onto workspace fields.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// How imported rows treat existing records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverwriteMode {
    /// Create new records only
    Append,
    /// Update existing records matched on the identity field
    Overlay,
}

/// Kind of import the engine runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobKind {
    /// Documents with native files
    NativeDocuments,
    /// Images attached to existing documents
    Images,
    /// Object import creating a production set record
    ProductionSet { artifact_type_id: i32 },
    /// Produced images imported into an existing production set
    Production { production_set_id: i64 },
}

/// Column value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Text,
    Integer,
    Boolean,
    DateTime,
}

/// Named, typed column of a job table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Text,
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Integer,
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Boolean,
        }
    }

    pub fn date_time(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::DateTime,
        }
    }
}

/// Single cell of a job table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn column_type(&self) -> ColumnType {
        match self {
            CellValue::Text(_) => ColumnType::Text,
            CellValue::Integer(_) => ColumnType::Integer,
            CellValue::Boolean(_) => ColumnType::Boolean,
            CellValue::DateTime(_) => ColumnType::DateTime,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

/// Tabular job input
///
/// Every row has exactly one cell per column, typed as the column declares.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobTable {
    columns: Vec<Column>,
    rows: Vec<Vec<CellValue>>,
}

impl JobTable {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        debug_assert_eq!(row.len(), self.columns.len(), "row width must match columns");
        debug_assert!(
            row.iter()
                .zip(&self.columns)
                .all(|(cell, column)| cell.column_type() == column.column_type),
            "cell types must match column types"
        );
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// All values of a column, in row order
    pub fn column_values(&self, name: &str) -> Vec<&CellValue> {
        match self.column_index(name) {
            Some(idx) => self.rows.iter().map(|row| &row[idx]).collect(),
            None => Vec::new(),
        }
    }
}

/// Engine settings for a single job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSettings {
    pub workspace_id: i64,
    pub identity_field_id: i64,
    /// Column used to match rows to records
    pub selected_identifier_field: Option<String>,
    pub overwrite_mode: OverwriteMode,
    /// Copy referenced files into the workspace repository
    pub copy_files: bool,
    pub native_file_path_field: Option<String>,
    pub parent_object_id_field: Option<String>,
    pub bates_number_field: Option<String>,
    pub document_identifier_field: Option<String>,
    pub file_location_field: Option<String>,
    pub auto_number_images: bool,
    pub extracted_text_contains_path: bool,
}

impl JobSettings {
    pub fn new(workspace_id: i64, identity_field_id: i64, overwrite_mode: OverwriteMode) -> Self {
        Self {
            workspace_id,
            identity_field_id,
            selected_identifier_field: None,
            overwrite_mode,
            copy_files: false,
            native_file_path_field: None,
            parent_object_id_field: None,
            bates_number_field: None,
            document_identifier_field: None,
            file_location_field: None,
            auto_number_images: false,
            extracted_text_contains_path: false,
        }
    }
}

/// Complete job submitted to the engine
#[derive(Debug, Clone, Serialize)]
pub struct ImportJob {
    pub kind: JobKind,
    pub settings: JobSettings,
    pub table: JobTable,
}

impl ImportJob {
    pub fn row_count(&self) -> usize {
        self.table.len()
    }
}
