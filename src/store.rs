//! Filesystem artifact store.
//!
//! Layout: `<models_dir>/model_<base>.json` and `<results_dir>/metrics_<base>.json`,
//! where `<base>` is the dataset file name without its extension. Every write goes
//! through a temp file in the destination directory and is renamed into place, so
//! readers see either the previous artifact or the new one.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::artifact::{MetricsDocument, ModelArtifact};
use crate::config::StorageConfig;
use crate::error::{ServiceError, ServiceResult};

pub const MODEL_FILE_PREFIX: &str = "model_";
pub const METRICS_FILE_PREFIX: &str = "metrics_";
pub const ARTIFACT_EXTENSION: &str = "json";

/// Dataset file name with directories and the extension removed.
pub fn base_name(dataset_file_name: &str) -> String {
    let path = Path::new(dataset_file_name);
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn model_file_name(base: &str) -> String {
    format!("{MODEL_FILE_PREFIX}{base}.{ARTIFACT_EXTENSION}")
}

pub fn metrics_file_name(base: &str) -> String {
    format!("{METRICS_FILE_PREFIX}{base}.{ARTIFACT_EXTENSION}")
}

/// Accept either `model_<base>.json` or a bare `<base>` and return the base name.
pub fn resolve_model_name(name: &str) -> ServiceResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("Model name is empty.".to_string()));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ServiceError::InvalidInput(format!(
            "Invalid model name: {name}"
        )));
    }
    let suffix = format!(".{ARTIFACT_EXTENSION}");
    let base = name
        .strip_prefix(MODEL_FILE_PREFIX)
        .and_then(|rest| rest.strip_suffix(&suffix))
        .unwrap_or(name);
    Ok(base.to_string())
}

/// Owns the storage roots for model artifacts and metrics documents.
#[derive(Debug)]
pub struct ArtifactStore {
    models_dir: PathBuf,
    results_dir: PathBuf,
    name_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ArtifactStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            models_dir: config.models_dir.clone(),
            results_dir: config.results_dir.clone(),
            name_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn model_path(&self, base: &str) -> PathBuf {
        self.models_dir.join(model_file_name(base))
    }

    pub fn metrics_path(&self, base: &str) -> PathBuf {
        self.results_dir.join(metrics_file_name(base))
    }

    pub fn write_model(&self, base: &str, model: &ModelArtifact) -> ServiceResult<PathBuf> {
        let path = self.model_path(base);
        stage_json(&path, model)?.commit(&path)?;
        tracing::debug!("Wrote model artifact {}", path.display());
        Ok(path)
    }

    pub fn write_metrics(&self, base: &str, metrics: &MetricsDocument) -> ServiceResult<PathBuf> {
        let path = self.metrics_path(base);
        stage_json(&path, metrics)?.commit(&path)?;
        tracing::debug!("Wrote metrics document {}", path.display());
        Ok(path)
    }

    /// Replace the model and metrics of `base` as one unit within this process.
    ///
    /// Both files are fully written before either is renamed into place; concurrent
    /// commits for the same base name are serialized so the pair always comes from
    /// the same run. If the metrics rename fails, the previous model (or its absence)
    /// is restored.
    pub fn commit(
        &self,
        base: &str,
        model: &ModelArtifact,
        metrics: &MetricsDocument,
    ) -> ServiceResult<(PathBuf, PathBuf)> {
        let model_path = self.model_path(base);
        let metrics_path = self.metrics_path(base);
        let staged_model = stage_json(&model_path, model)?;
        let staged_metrics = stage_json(&metrics_path, metrics)?;

        let lock = self.name_lock(base);
        let _guard = lock.lock().unwrap_or_else(|err| err.into_inner());
        let previous_model = read_if_exists(&model_path)?;
        staged_model.commit(&model_path)?;
        if let Err(err) = staged_metrics.commit(&metrics_path) {
            restore(&model_path, previous_model);
            return Err(err);
        }
        tracing::info!(
            "Committed artifacts for '{base}': {} and {}",
            model_path.display(),
            metrics_path.display()
        );
        Ok((model_path, metrics_path))
    }

    /// Load and validate the artifact for a model name (see [`resolve_model_name`]).
    pub fn read_model(&self, model_name: &str) -> ServiceResult<ModelArtifact> {
        let path = self.locate_model(model_name)?;
        let artifact: ModelArtifact = read_json(&path)?;
        artifact
            .validate()
            .map_err(|reason| ServiceError::CorruptArtifact {
                path: path.clone(),
                reason,
            })?;
        Ok(artifact)
    }

    /// Path of an existing model artifact.
    pub fn locate_model(&self, model_name: &str) -> ServiceResult<PathBuf> {
        let base = resolve_model_name(model_name)?;
        let path = self.model_path(&base);
        if !path.is_file() {
            return Err(ServiceError::ModelNotFound {
                name: model_name.to_string(),
            });
        }
        Ok(path)
    }

    pub fn read_metrics(&self, base: &str) -> ServiceResult<MetricsDocument> {
        let path = self.metrics_path(base);
        if base.is_empty() || !path.is_file() {
            return Err(ServiceError::MetricsNotFound {
                name: base.to_string(),
            });
        }
        read_json(&path)
    }

    /// Base names of all stored model artifacts, sorted.
    pub fn list_models(&self) -> ServiceResult<Vec<String>> {
        let entries = match std::fs::read_dir(&self.models_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(ServiceError::io(&self.models_dir, err)),
        };
        let suffix = format!(".{ARTIFACT_EXTENSION}");
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|file_name| {
                file_name
                    .strip_prefix(MODEL_FILE_PREFIX)
                    .and_then(|rest| rest.strip_suffix(&suffix))
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn name_lock(&self, base: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .name_locks
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        locks.entry(base.to_string()).or_default().clone()
    }
}

/// Fully written and synced temp file waiting to be renamed over its destination.
struct Staged(NamedTempFile);

impl Staged {
    fn commit(self, dest: &Path) -> ServiceResult<()> {
        self.0
            .persist(dest)
            .map(|_| ())
            .map_err(|err| ServiceError::io(dest, err.error))
    }
}

fn stage_json<T: Serialize>(dest: &Path, value: &T) -> ServiceResult<Staged> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|err| ServiceError::json(dest, err))?;
    stage_bytes(dest, |file| file.write_all(&bytes))
}

/// Write into a temp file next to `dest` using `fill`, then flush and fsync it.
fn stage_bytes(
    dest: &Path,
    fill: impl FnOnce(&mut NamedTempFile) -> std::io::Result<()>,
) -> ServiceResult<Staged> {
    let dir = dest
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|err| ServiceError::io(dir, err))?;
    let mut file = NamedTempFile::new_in(dir).map_err(|err| ServiceError::io(dir, err))?;
    fill(&mut file)
        .and_then(|_| file.flush())
        .and_then(|_| file.as_file().sync_all())
        .map_err(|err| ServiceError::io(file.path(), err))?;
    Ok(Staged(file))
}

/// Stream `fill` into a temp file and atomically move it to `dest`.
pub(crate) fn write_atomic(
    dest: &Path,
    fill: impl FnOnce(&mut NamedTempFile) -> std::io::Result<()>,
) -> ServiceResult<()> {
    stage_bytes(dest, fill)?.commit(dest)
}

fn read_if_exists(path: &Path) -> ServiceResult<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(ServiceError::io(path, err)),
    }
}

/// Put `path` back to its earlier contents, or remove it if it did not exist.
fn restore(path: &Path, previous: Option<Vec<u8>>) {
    let outcome = match previous {
        Some(bytes) => write_atomic(path, |file| file.write_all(&bytes)),
        None => std::fs::remove_file(path).map_err(|err| ServiceError::io(path, err)),
    };
    match outcome {
        Ok(()) => tracing::warn!("Rolled back {} after a failed commit", path.display()),
        Err(err) => tracing::warn!("Failed to roll back {}: {err}", path.display()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> ServiceResult<T> {
    let bytes = std::fs::read(path).map_err(|err| ServiceError::io(path, err))?;
    serde_json::from_slice(&bytes).map_err(|err| ServiceError::json(path, err))
}
