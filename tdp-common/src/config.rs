//! Bootstrap configuration loading and value resolution
//!
//! Every bootstrap value is resolved in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`TDP_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file never aborts startup: the compiled
//! defaults are used instead and the outcome is reported as a [`ConfigSource`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the execution directory
pub const ENV_EXECUTION_DIR: &str = "TDP_EXECUTION_DIR";
/// Environment variable overriding the platform host
pub const ENV_PLATFORM_HOST: &str = "TDP_PLATFORM_HOST";
/// Environment variable overriding the platform version
pub const ENV_PLATFORM_VERSION: &str = "TDP_PLATFORM_VERSION";
/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "TDP_LOG_LEVEL";

/// Name of the configuration resource file uploaded to the platform
pub const DEFAULT_CONFIG_RESOURCE_NAME: &str = "DataPopulateConfiguration.Json";

/// Bootstrap configuration loaded from TOML file
///
/// All fields are optional; anything left out falls through to the compiled defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Review platform host name (no protocol)
    #[serde(default)]
    pub platform_host: Option<String>,

    /// Workspace that receives the generated records
    #[serde(default)]
    pub workspace_id: Option<i64>,

    /// Platform version used to select the dependency manifest
    #[serde(default)]
    pub platform_version: Option<String>,

    /// Directory dependencies are staged into and sample files are read from
    #[serde(default)]
    pub execution_dir: Option<PathBuf>,

    /// Name of the settings resource file on the platform
    #[serde(default)]
    pub config_resource_name: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Compiled defaults used when no other source supplies a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub execution_dir: PathBuf,
    pub log_level: String,
    pub config_resource_name: String,
}

impl CompiledDefaults {
    /// Defaults for the running process
    ///
    /// The execution directory is the directory holding the running binary,
    /// falling back to the current directory.
    pub fn for_current_platform() -> Self {
        let execution_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            execution_dir,
            log_level: default_log_level(),
            config_resource_name: DEFAULT_CONFIG_RESOURCE_NAME.to_string(),
        }
    }
}

/// Default TOML config file location for the platform
///
/// On Linux `~/.config/tdp/config.toml` is preferred, then `/etc/tdp/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("tdp").join("config.toml"));

    if cfg!(target_os = "linux") {
        if let Some(path) = user_config.as_ref().filter(|p| p.exists()) {
            return Some(path.clone());
        }
        let system_config = PathBuf::from("/etc/tdp/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
        return None;
    }

    user_config.filter(|p| p.exists())
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

/// Outcome of locating and reading the TOML config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Loaded(PathBuf),
    /// File exists or was named explicitly but could not be read or parsed
    Unusable { path: PathBuf, error: String },
    /// No explicit path and no file at the default locations
    NotFound,
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::Loaded(path) => {
                info!(path = %path.display(), "Loaded TOML configuration");
            }
            ConfigSource::Unusable { path, error } => {
                warn!(path = %path.display(), error = %error, "TOML config unusable, using defaults");
            }
            ConfigSource::NotFound => {
                warn!("No TOML config file found, using defaults");
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ConfigSource::Loaded(_))
    }
}

/// Resolves bootstrap values across CLI, environment, TOML and defaults
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    toml: TomlConfig,
    defaults: CompiledDefaults,
}

impl ConfigResolver {
    /// Build a resolver from an explicit TOML path, or the platform default path
    ///
    /// Missing or invalid TOML is replaced with an empty config. Nothing is
    /// logged here: the returned [`ConfigSource`] is logged by the caller once
    /// a subscriber is installed, since the log level itself comes from this config.
    pub fn load(explicit_path: Option<&Path>) -> (Self, ConfigSource) {
        let path = explicit_path
            .map(Path::to_path_buf)
            .or_else(default_config_path);

        let (toml, source) = match path {
            Some(path) => match load_toml_config(&path) {
                Ok(config) => (config, ConfigSource::Loaded(path)),
                Err(e) => (
                    TomlConfig::default(),
                    ConfigSource::Unusable {
                        path,
                        error: e.to_string(),
                    },
                ),
            },
            None => (TomlConfig::default(), ConfigSource::NotFound),
        };

        (Self::from_toml(toml), source)
    }

    /// Build a resolver over an already loaded TOML config
    pub fn from_toml(toml: TomlConfig) -> Self {
        Self {
            toml,
            defaults: CompiledDefaults::for_current_platform(),
        }
    }

    /// Loaded TOML configuration
    pub fn toml(&self) -> &TomlConfig {
        &self.toml
    }

    /// Execution directory: CLI → `TDP_EXECUTION_DIR` → TOML → directory of the binary
    pub fn execution_dir(&self, cli_arg: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }
        if let Some(path) = env_value(ENV_EXECUTION_DIR) {
            return PathBuf::from(path);
        }
        if let Some(path) = &self.toml.execution_dir {
            return path.clone();
        }
        self.defaults.execution_dir.clone()
    }

    /// Platform host: CLI → `TDP_PLATFORM_HOST` → TOML (no compiled default)
    pub fn platform_host(&self, cli_arg: Option<&str>) -> Option<String> {
        cli_arg
            .map(str::to_string)
            .or_else(|| env_value(ENV_PLATFORM_HOST))
            .or_else(|| self.toml.platform_host.clone())
    }

    /// Platform version: CLI → `TDP_PLATFORM_VERSION` → TOML (no compiled default)
    pub fn platform_version(&self, cli_arg: Option<&str>) -> Option<String> {
        cli_arg
            .map(str::to_string)
            .or_else(|| env_value(ENV_PLATFORM_VERSION))
            .or_else(|| self.toml.platform_version.clone())
    }

    /// Workspace id: CLI → TOML
    pub fn workspace_id(&self, cli_arg: Option<i64>) -> Option<i64> {
        cli_arg.or(self.toml.workspace_id)
    }

    /// Settings resource file name: TOML → compiled default
    pub fn config_resource_name(&self) -> String {
        self.toml
            .config_resource_name
            .clone()
            .unwrap_or_else(|| self.defaults.config_resource_name.clone())
    }

    /// Log level: `TDP_LOG_LEVEL` → TOML → "info"
    pub fn log_level(&self) -> String {
        env_value(ENV_LOG_LEVEL).unwrap_or_else(|| {
            if self.toml.logging.level.trim().is_empty() {
                self.defaults.log_level.clone()
            } else {
                self.toml.logging.level.clone()
            }
        })
    }
}

/// Non-blank environment variable value
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
