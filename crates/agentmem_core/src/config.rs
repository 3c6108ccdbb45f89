//! YAML configuration for store location and logging.
//!
//! # Responsibility
//! - Load `Config` from an explicit file or the first of the standard
//!   locations, falling back to defaults when no file exists.
//! - Resolve the storage base path and log directory, expanding `~`.
//!
//! # Invariants
//! - A missing config file is not an error; a malformed one is.
//! - Unset fields keep their defaults.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".agentmem";
const LOCAL_CONFIG_FILE: &str = "agentmem.yaml";
const SYSTEM_CONFIG_FILE: &str = "/etc/agentmem/config.yaml";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    Encode(serde_yaml::Error),
    Write {
        path: PathBuf,
        source: io::Error,
    },
    /// `~` expansion or a default path needs a home directory.
    HomeDirUnavailable,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config file `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config file `{}`: {source}", path.display())
            }
            Self::Encode(source) => write!(f, "failed to encode config: {source}"),
            Self::Write { path, source } => {
                write!(f, "failed to write config file `{}`: {source}", path.display())
            }
            Self::HomeDirUnavailable => write!(f, "home directory is not available"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } | Self::Write { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Encode(source) => Some(source),
            Self::HomeDirUnavailable => None,
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store base path; empty means `~/.agentmem/tasks`.
    pub tasks_path: String,
    /// One of `trace|debug|info|warn|error`; defaults to
    /// [`default_log_level`].
    pub log_level: String,
    /// Log directory; empty means `~/.agentmem/logs`.
    pub log_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tasks_path: String::new(),
            log_level: default_log_level().to_string(),
            log_dir: String::new(),
        }
    }
}

impl Config {
    /// Loads `path`, returning defaults when it does not exist.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the first existing file of `./agentmem.yaml`,
    /// `~/.agentmem/config.yaml`, `/etc/agentmem/config.yaml`.
    pub fn load_from_default_locations() -> ConfigResult<Self> {
        for candidate in default_locations() {
            if candidate.is_file() {
                return Self::load(candidate);
            }
        }
        Ok(Self::default())
    }

    /// Writes this config as YAML, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let text = serde_yaml::to_string(self).map_err(ConfigError::Encode)?;
        fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn resolve_tasks_path(&self) -> ConfigResult<PathBuf> {
        resolve_or_default(&self.tasks_path, "tasks")
    }

    pub fn resolve_log_dir(&self) -> ConfigResult<PathBuf> {
        resolve_or_default(&self.log_dir, "logs")
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(home) = dirs::home_dir() {
        locations.push(home.join(APP_DIR).join("config.yaml"));
    }
    locations.push(PathBuf::from(SYSTEM_CONFIG_FILE));
    locations
}

fn resolve_or_default(configured: &str, default_leaf: &str) -> ConfigResult<PathBuf> {
    let configured = configured.trim();
    if configured.is_empty() {
        let home = dirs::home_dir().ok_or(ConfigError::HomeDirUnavailable)?;
        return Ok(home.join(APP_DIR).join(default_leaf));
    }
    expand_tilde(configured)
}

fn expand_tilde(path: &str) -> ConfigResult<PathBuf> {
    if path == "~" {
        return dirs::home_dir().ok_or(ConfigError::HomeDirUnavailable);
    }
    match path.strip_prefix("~/") {
        Some(rest) => Ok(dirs::home_dir()
            .ok_or(ConfigError::HomeDirUnavailable)?
            .join(rest)),
        None => Ok(PathBuf::from(path)),
    }
}
