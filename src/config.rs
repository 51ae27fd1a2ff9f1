//! User configuration, read from `config.json` in the platform config
//! directory. A missing file means defaults; a malformed one is an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "config.json";
const DB_FILE_NAME: &str = "presenter.sqlite";
const SCRIPTURE_FILE_NAME: &str = "scripture.sqlite";
const DEFAULT_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the configuration directory")]
    NoProjectDirs,
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A terminal device used as an extra output display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub path: PathBuf,
    #[serde(default = "default_columns")]
    pub columns: u16,
    #[serde(default = "default_rows")]
    pub rows: u16,
}

fn default_columns() -> u16 {
    80
}

fn default_rows() -> u16 {
    24
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    /// Scripture databases to try, first existing one wins.
    pub scripture_paths: Vec<PathBuf>,
    pub media_dir: PathBuf,
    pub displays: Vec<DisplayConfig>,
    /// Re-send the last live payload when the output surface is recreated.
    pub resend_on_reopen: bool,
    pub search_limit: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::rooted_at(&default_data_dir())
    }
}

impl Config {
    /// Defaults with every data path placed under `data_dir`.
    pub fn rooted_at(data_dir: &Path) -> Self {
        Self {
            database_path: data_dir.join(DB_FILE_NAME),
            scripture_paths: vec![
                data_dir.join(SCRIPTURE_FILE_NAME),
                PathBuf::from(SCRIPTURE_FILE_NAME),
            ],
            media_dir: data_dir.join("media"),
            displays: Vec::new(),
            resend_on_reopen: false,
            search_limit: DEFAULT_SEARCH_LIMIT,
            log_level: "info".to_string(),
        }
    }

    /// Load from the platform config directory.
    pub fn load() -> Result<Self, ConfigError> {
        let dirs = project_dirs().ok_or(ConfigError::NoProjectDirs)?;
        Self::load_from(&dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(write_err)?;
        }
        let contents = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, contents).map_err(write_err)
    }

    /// Directory holding the database and the log file.
    pub fn data_dir(&self) -> PathBuf {
        self.database_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(default_data_dir)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "worship", "worship-presenter")
}

fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}
