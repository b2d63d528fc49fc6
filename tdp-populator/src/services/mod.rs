//! Services for tdp-populator

pub mod dependency_resolver;
pub mod fetcher;
pub mod import_orchestrator;
pub mod post_install;

pub use dependency_resolver::{
    DependencyResolver, DynamicLibraryLoader, FileStatus, LibraryLoader, LoadStatus,
    PlatformVersion,
};
pub use fetcher::{ProtocolTemplate, ResilientFetcher};
pub use import_orchestrator::ImportOrchestrator;
pub use post_install::{retrieve_settings, PostInstallRun, RunOptions};
