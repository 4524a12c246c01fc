//! Where `tabml` keeps its own files (currently only logs).
//!
//! `TABML_HOME` replaces the OS config directory as the base; the `.tabml`
//! folder always sits under that base.

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

pub const APP_DIR_NAME: &str = ".tabml";
pub const HOME_ENV: &str = "TABML_HOME";

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("Neither TABML_HOME nor an OS config directory is available for log files")]
    NoBaseDir,
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Logs directory under the `.tabml` home, created on demand.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    let os_config = BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf());
    let home = home_dir(std::env::var_os(HOME_ENV).map(PathBuf::from), os_config)
        .ok_or(AppDirError::NoBaseDir)?;
    let logs = home.join("logs");
    create_dir(&logs)?;
    Ok(logs)
}

/// An explicit (non-empty) base wins over the OS config directory.
fn home_dir(env_base: Option<PathBuf>, os_config: Option<PathBuf>) -> Option<PathBuf> {
    env_base
        .filter(|base| !base.as_os_str().is_empty())
        .or(os_config)
        .map(|base| base.join(APP_DIR_NAME))
}

fn create_dir(path: &Path) -> Result<(), AppDirError> {
    std::fs::create_dir_all(path).map_err(|source| AppDirError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
