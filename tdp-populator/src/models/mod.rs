//! Data models for tdp-populator
//!
//! - Run settings parsed from the configuration payload
//! - Import job definitions
//! - Job, stage and run outcomes
//! - Pipeline state machine

pub mod job;
pub mod outcome;
pub mod run_state;
pub mod settings;

pub use job::{CellValue, Column, ColumnType, ImportJob, JobKind, JobSettings, JobTable, OverwriteMode};
pub use outcome::{JobReport, RunResult, StageOutcome};
pub use run_state::{PipelineState, PopulationRun, StateTransition};
pub use settings::{Credentials, ImportSettings, MAX_DOCUMENTS};
