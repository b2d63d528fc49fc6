//! # TDP Common Library
//!
//! Shared code for the test data populator crates:
//! - Error type shared by configuration and I/O helpers
//! - Bootstrap configuration loading and value resolution
//! - Run event types (PopulatorEvent enum) and the EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
