//! tdp-populator library
//!
//! Populates a document-review workspace with synthetic test records.

pub mod error;
pub mod models;
pub mod platform;
pub mod services;

pub use error::{PopulateError, Result};
