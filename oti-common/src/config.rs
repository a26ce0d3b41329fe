//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "OTI_ROOT_FOLDER";

/// Service settings read from `config.toml`
///
/// Every key is optional; missing keys fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Root folder override (tier 3 of root folder resolution)
    pub root_folder: Option<PathBuf>,
    /// Address the HTTP service binds to
    pub bind_address: String,
    /// Database file name, relative to the root folder unless absolute
    pub database_file: PathBuf,
    /// SQLite busy timeout applied to every pooled connection
    pub busy_timeout_ms: u64,
    /// Upper bound for retrying a bulk load that hit lock contention
    pub max_lock_wait_ms: u64,
    /// Capacity of the in-process job dispatch queue
    pub dispatch_queue_capacity: usize,
    /// Endpoint of the external calculation worker
    pub worker_url: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            bind_address: "127.0.0.1:5740".to_string(),
            database_file: PathBuf::from("indicators.db"),
            busy_timeout_ms: 5000,
            max_lock_wait_ms: 5000,
            dispatch_queue_capacity: 64,
            worker_url: None,
        }
    }
}

impl ServiceConfig {
    /// Parse settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ServiceConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load settings from an explicit file, or the platform config file when
    /// none is given. A missing platform file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match find_config_file() {
                Ok(p) => p,
                Err(_) => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.dispatch_queue_capacity == 0 {
            return Err(Error::Config(
                "dispatch_queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.bind_address.trim().is_empty() {
            return Err(Error::Config("bind_address must not be empty".to_string()));
        }
        Ok(())
    }

    /// Absolute database path for the given root folder
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        if self.database_file.is_absolute() {
            self.database_file.clone()
        } else {
            root_folder.join(&self.database_file)
        }
    }
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. `root_folder` from the config file
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    config: &ServiceConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(root) = &config.root_folder {
        return root.clone();
    }

    default_root_folder()
}

/// Locate the platform config file
fn find_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("oti").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/oti/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("oti"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/oti"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("oti"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/oti"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("oti"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\oti"))
    } else {
        PathBuf::from("./oti_data")
    }
}
