//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from an optional TOML file. A missing or
//! unreadable file is never fatal: the services start with compiled defaults
//! and log a warning.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `VI_ROOT_FOLDER` environment variable
//! 3. TOML config file `root_folder`
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "VI_ROOT_FOLDER";

/// Environment variable overriding the TOML config file location
pub const CONFIG_FILE_ENV: &str = "VI_CONFIG";

/// Topic carrying manifest rebuild requests
pub const DEFAULT_REBUILD_TOPIC: &str = "ingest-uploaded";

/// Bootstrap configuration loaded from TOML
///
/// Every section is optional; absent keys fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding buckets and the record database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub messaging: MessagingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Object storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket that upload events and rebuilds operate on
    #[serde(default = "default_bucket")]
    pub default_bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_bucket: default_bucket(),
        }
    }
}

/// Message bus settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Messages buffered per subscriber before the oldest are dropped
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            capacity: default_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when neither VI_LOG nor RUST_LOG is set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_bucket() -> String {
    "vi-media".to_string()
}

fn default_topic() -> String {
    DEFAULT_REBUILD_TOPIC.to_string()
}

fn default_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {e}")))
    }

    /// Load from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Load from the first config file found, or defaults
    ///
    /// Parse errors are reported as warnings; the service still starts.
    pub fn load_or_default() -> Self {
        let Some(path) = locate_config_file() else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(config) => {
                info!("Loaded config: {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Find the config file: `VI_CONFIG`, then user config dir, then /etc
pub fn locate_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!("{} points at missing file {}", CONFIG_FILE_ENV, path.display());
    }

    let user_config = dirs::config_dir().map(|d| d.join("vi-media").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/vi-media/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("vi-media"))
        .unwrap_or_else(|| PathBuf::from("./vi_data"))
}

/// Resolves the root folder in priority order
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_root: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!("[{}] Root folder from command line: {}", self.module_name, path.display());
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                info!("[{}] Root folder from {}: {}", self.module_name, ROOT_FOLDER_ENV, path);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            info!("[{}] Root folder from TOML: {}", self.module_name, path.display());
            return path.clone();
        }

        let path = default_root_folder();
        info!("[{}] Root folder default: {}", self.module_name, path.display());
        path
    }
}

/// Lays out the root folder on disk
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    /// Directory backing a storage bucket
    pub fn bucket_path(&self, bucket: &str) -> PathBuf {
        self.root_folder.join("buckets").join(bucket)
    }
}
