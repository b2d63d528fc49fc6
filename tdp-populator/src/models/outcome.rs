//! Job, stage and run results

use serde::{Deserialize, Serialize};
use tdp_common::events::StageName;

use crate::error::PopulateError;

/// Completion report returned by the job engine for one job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    /// Rows the engine processed
    pub rows_processed: usize,
    /// Rows rejected individually (non-fatal)
    pub error_row_count: usize,
    /// Fatal condition that stopped the job
    pub fatal_error: Option<String>,
}

impl JobReport {
    pub fn completed(rows_processed: usize, error_row_count: usize) -> Self {
        Self {
            rows_processed,
            error_row_count,
            fatal_error: None,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            rows_processed: 0,
            error_row_count: 0,
            fatal_error: Some(message.into()),
        }
    }
}

/// Result of one job-submitting pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: StageName,
    pub rows_submitted: usize,
    pub error_row_count: usize,
    pub fatal_error: Option<String>,
}

impl StageOutcome {
    pub fn from_report(stage: StageName, rows_submitted: usize, report: JobReport) -> Self {
        Self {
            stage,
            rows_submitted,
            error_row_count: report.error_row_count,
            fatal_error: report.fatal_error,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal_error.is_some()
    }

    /// Convert a fatal outcome into the error that terminates the run
    pub fn into_result(self) -> Result<Self, PopulateError> {
        match self.fatal_error {
            Some(message) => Err(PopulateError::ImportJobFatal(message)),
            None => Ok(self),
        }
    }
}

/// Result surfaced to the host after a run
///
/// `message` is empty on success and holds the full error chain on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub success: bool,
    pub message: String,
}

impl RunResult {
    pub fn success() -> Self {
        Self {
            success: true,
            message: String::new(),
        }
    }

    pub fn failure(error: PopulateError) -> Self {
        Self {
            success: false,
            message: format!("{:#}", anyhow::Error::new(error)),
        }
    }
}
