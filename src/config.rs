//! Storage roots for datasets, model artifacts and metrics documents.
//!
//! Roots are resolved once and handed to the artifact store explicitly, so several
//! stores (one per test, for example) can live in the same process.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the dataset root.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
/// Environment variable overriding the model artifact root.
pub const MODEL_DIR_ENV: &str = "MODEL_DIR";
/// Environment variable overriding the metrics root.
pub const RESULTS_DIR_ENV: &str = "RESULTS_DIR";

/// Errors that may occur while loading configuration or preparing storage roots.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to create a storage root.
    #[error("Unable to create storage directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Filesystem roots used by the artifact store.
///
/// Config keys (TOML): `datasets_dir`, `models_dir`, `results_dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_datasets_dir")]
    pub datasets_dir: PathBuf,
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_datasets_dir() -> PathBuf {
    PathBuf::from("datasets")
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            datasets_dir: default_datasets_dir(),
            models_dir: default_models_dir(),
            results_dir: default_results_dir(),
        }
    }
}

impl StorageConfig {
    /// Place all three roots under a single directory.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            datasets_dir: root.join("datasets"),
            models_dir: root.join("models"),
            results_dir: root.join("results"),
        }
    }

    /// Defaults overridden by `DATA_DIR`, `MODEL_DIR` and `RESULTS_DIR`.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Read a TOML config file; missing keys fall back to the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `path` when given, otherwise [`StorageConfig::from_env`].
    pub fn load_or_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Ok(Self::from_env()),
        }
    }

    /// Create every storage root that does not exist yet.
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        for dir in [&self.datasets_dir, &self.models_dir, &self.results_dir] {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(dir) = non_empty(DATA_DIR_ENV) {
            self.datasets_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty(MODEL_DIR_ENV) {
            self.models_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty(RESULTS_DIR_ENV) {
            self.results_dir = PathBuf::from(dir);
        }
        self
    }
}
