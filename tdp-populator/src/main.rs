//! Test Data Populator (tdp-populator) - command-line entry point
//!
//! Offline tooling around the population run: inspect the dependency manifest
//! for a platform version, preflight a workspace's run options and library
//! folder against a local settings file, and fetch resource files with protocol fallback.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tdp_common::config::ConfigResolver;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tdp_populator::models::ImportSettings;
use tdp_populator::services::dependency_resolver::{
    library_folder_path, resolve_manifest, DependencyResolver, DynamicLibraryLoader,
    PlatformVersion,
};
use tdp_populator::services::fetcher::{config_download_path, ProtocolTemplate, ResilientFetcher};
use tdp_populator::services::RunOptions;

/// Command-line arguments for tdp-populator
#[derive(Parser, Debug)]
#[command(name = "tdp-populator")]
#[command(about = "Populate a review workspace with synthetic test data")]
#[command(version)]
struct Args {
    /// TOML bootstrap configuration
    #[arg(long, global = true, env = "TDP_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, overrides the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the dependency manifest for a platform version
    Manifest {
        #[arg(long)]
        platform_version: Option<String>,
    },

    /// Validate, stage and load dependencies using a local settings file
    Preflight {
        /// Settings configuration payload (JSON)
        #[arg(long)]
        settings: PathBuf,

        #[arg(long)]
        workspace_id: Option<i64>,

        #[arg(long)]
        execution_dir: Option<PathBuf>,

        #[arg(long)]
        platform_version: Option<String>,
    },

    /// Download a resource file, https first then http
    Fetch {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        artifact_id: i64,

        #[arg(long)]
        token: String,

        /// Destination file (defaults to a unique temp file)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (resolver, config_source) = ConfigResolver::load(args.config.as_deref());

    let level = args.log_level.clone().unwrap_or_else(|| resolver.log_level());
    init_logging(&level, resolver.toml().logging.file.as_deref())?;
    config_source.log();

    match args.command {
        Command::Manifest { platform_version } => {
            let version = platform_version_arg(&resolver, platform_version.as_deref())?;
            let manifest = resolve_manifest(version);
            println!("{}", serde_json::to_string_pretty(&manifest)?);
        }

        Command::Preflight {
            settings,
            workspace_id,
            execution_dir,
            platform_version,
        } => {
            let version = platform_version_arg(&resolver, platform_version.as_deref())?;
            let options = RunOptions::resolve(&resolver, workspace_id, execution_dir.as_deref())?;
            info!(options = ?options, "Run options resolved");

            let settings = ImportSettings::from_file(&settings)
                .with_context(|| format!("Failed to read settings from {}", settings.display()))?;
            info!(settings = ?settings, "Settings parsed");

            let dependencies = DependencyResolver::new(version, Arc::new(DynamicLibraryLoader::new()));
            let prepared = dependencies
                .prepare(&library_folder_path(settings.library_folder()), &options.execution_dir)
                .await
                .context("Dependency preflight failed")?;

            let report = serde_json::json!({
                "options": options,
                "dependencies": prepared,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Fetch {
            host,
            artifact_id,
            token,
            output,
        } => {
            let host = resolver
                .platform_host(host.as_deref())
                .context("Platform host not configured (use --host or TDP_PLATFORM_HOST)")?;
            let destination = output.unwrap_or_else(config_download_path);

            let fetcher = ResilientFetcher::new()?;
            let template = ProtocolTemplate::resource_download(&host, artifact_id, &token);
            fetcher
                .fetch_with_fallback(&template, &destination)
                .await
                .context("Resource download failed")?;

            println!("{}", destination.display());
        }
    }

    Ok(())
}

fn platform_version_arg(resolver: &ConfigResolver, cli_arg: Option<&str>) -> Result<PlatformVersion> {
    let raw = resolver
        .platform_version(cli_arg)
        .context("Platform version not configured (use --platform-version or TDP_PLATFORM_VERSION)")?;
    Ok(raw.parse()?)
}

fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}
