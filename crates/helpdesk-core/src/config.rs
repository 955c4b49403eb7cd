use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::db::DEFAULT_BUSY_TIMEOUT;

/// Largest accepted export batch.
pub const MAX_BATCH_SIZE: u32 = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpdeskConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub export: ExportConfig,
    /// Preferred output mode (`pretty`, `text`, `json`).
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DatabaseConfig {
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Rows fetched per export batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Writer threads.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Write jobs that may wait for a free writer.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
    /// Whole-export deadline; none means unbounded.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            workers: default_workers(),
            queue_depth: default_queue_depth(),
            timeout_secs: None,
        }
    }
}

impl ExportConfig {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first out-of-range field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(ConfigError::Invalid {
                field: "export.batch_size",
                reason: format!("{} is outside 1..={MAX_BATCH_SIZE}", self.batch_size),
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "export.workers",
                reason: "at least one writer is required".to_string(),
            });
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "export.queue_depth",
                reason: "the job queue needs room for one batch".to_string(),
            });
        }
        Ok(())
    }
}

impl HelpdeskConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for out-of-range values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.export.validate()
    }
}

/// Config files consulted when no explicit path is given, in order.
#[must_use]
pub fn candidate_paths(working_dir: &Path) -> Vec<PathBuf> {
    let mut paths = vec![working_dir.join(".helpdesk/config.toml")];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("helpdesk/config.toml"));
    }
    paths
}

/// Load and validate the effective config.
///
/// An explicit path must exist. Otherwise the first existing candidate from
/// [`candidate_paths`] wins, and defaults apply when none exists.
///
/// # Errors
///
/// Returns [`ConfigError`] when a file cannot be read or parsed, or holds
/// invalid values.
pub fn load_config(explicit: Option<&Path>, working_dir: &Path) -> Result<HelpdeskConfig, ConfigError> {
    let config = match explicit {
        Some(path) => load_from(path)?,
        None => match candidate_paths(working_dir).into_iter().find(|p| p.exists()) {
            Some(path) => load_from(&path)?,
            None => HelpdeskConfig::default(),
        },
    };
    config.validate()?;
    Ok(config)
}

fn load_from(path: &Path) -> Result<HelpdeskConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[allow(clippy::cast_possible_truncation)]
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT.as_millis() as u64
}

const fn default_batch_size() -> u32 {
    200
}

const fn default_workers() -> usize {
    4
}

const fn default_queue_depth() -> usize {
    4
}
