//! Training pipeline: load, split, fit, evaluate, persist.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifact::{MetricsDocument, ModelArtifact};
use crate::dataset::loader::load_labeled;
use crate::dataset::split::train_test_split;
use crate::error::{ServiceError, ServiceResult};
use crate::ml::forest::{ForestOptions, ForestTrainError, TrainDataset, train_random_forest};
use crate::ml::metrics::ClassificationReport;
use crate::store::{ArtifactStore, base_name};

/// Model and split settings for one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    /// Held-out fraction, strictly between 0 and 1.
    pub test_size: f64,
    pub random_state: u64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            test_size: 0.2,
            random_state: 42,
        }
    }
}

impl Hyperparameters {
    /// Range checks applied at the boundary.
    pub fn validate(&self) -> ServiceResult<()> {
        if self.n_estimators < 1 {
            return Err(ServiceError::InvalidInput(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(ServiceError::InvalidInput(
                "max_depth must be at least 1 when set".to_string(),
            ));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ServiceError::InvalidInput(format!(
                "test_size must be between 0 and 1 (exclusive), got {}",
                self.test_size
            )));
        }
        Ok(())
    }

    fn forest_options(&self) -> ForestOptions {
        ForestOptions {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            seed: self.random_state,
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingResult {
    pub model_path: PathBuf,
    pub report: ClassificationReport,
    pub accuracy: f32,
    pub metrics_path: PathBuf,
}

/// Fit a forest on `dataset_path` and persist the model with its metrics.
///
/// Nothing is written unless fitting and evaluation both succeed.
pub fn train(
    store: &ArtifactStore,
    dataset_path: &Path,
    target_column: &str,
    hyperparameters: &Hyperparameters,
    cancel: Option<&AtomicBool>,
) -> ServiceResult<TrainingResult> {
    let result = run(store, dataset_path, target_column, hyperparameters, cancel);
    if let Err(err) = &result {
        warn!("Training on {} failed: {err}", dataset_path.display());
    }
    result
}

fn run(
    store: &ArtifactStore,
    dataset_path: &Path,
    target_column: &str,
    hyperparameters: &Hyperparameters,
    cancel: Option<&AtomicBool>,
) -> ServiceResult<TrainingResult> {
    let started = Instant::now();
    let dataset = load_labeled(dataset_path, target_column)?;
    info!(
        "Training on {} ({} rows, {} features, target '{target_column}')",
        dataset_path.display(),
        dataset.len(),
        dataset.n_features()
    );

    let (train_set, test_set) = train_test_split(
        &dataset,
        hyperparameters.test_size,
        hyperparameters.random_state,
    )
    .map_err(ServiceError::InvalidInput)?;
    let n_features = dataset.n_features();
    let feature_names = dataset.feature_names;

    let train_data = TrainDataset::from_labels(n_features, train_set.x, &train_set.y);
    let model = train_random_forest(&train_data, &hyperparameters.forest_options(), cancel)
        .map_err(|err| match err {
            ForestTrainError::Cancelled { .. } => ServiceError::Cancelled,
            other => ServiceError::Training(other.to_string()),
        })?;

    let predicted: Vec<String> = test_set
        .x
        .iter()
        .map(|row| model.predict_label(row).to_string())
        .collect();
    let report = ClassificationReport::from_labels(&test_set.y, &predicted);
    let accuracy = report.accuracy;

    let base = base_name(&dataset_path.to_string_lossy());
    let artifact = ModelArtifact::new(
        base.as_str(),
        target_column,
        feature_names,
        hyperparameters.clone(),
        model,
    );
    let metrics = MetricsDocument {
        accuracy,
        report: report.clone(),
    };
    let (model_path, metrics_path) = store.commit(&base, &artifact, &metrics)?;

    info!(
        "Trained '{base}' on {} rows, held out {}: accuracy {accuracy:.4} in {:.2?}",
        train_data.x.len(),
        test_set.y.len(),
        started.elapsed()
    );
    Ok(TrainingResult {
        model_path,
        report,
        accuracy,
        metrics_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::error::ErrorKind;
    use tempfile::tempdir;

    fn write_dataset(dir: &Path) -> PathBuf {
        let mut csv = String::from("a,b,label\n");
        for i in 0..30 {
            let v = i as f32 * 0.1;
            csv.push_str(&format!("{v},{},left\n", 1.0 - v));
            csv.push_str(&format!("{},{v},right\n", 10.0 + v));
        }
        let path = dir.join("blobs.csv");
        std::fs::write(&path, csv).unwrap();
        path
    }

    fn small_params() -> Hyperparameters {
        Hyperparameters {
            n_estimators: 8,
            test_size: 0.25,
            random_state: 3,
            ..Hyperparameters::default()
        }
    }

    #[test]
    fn defaults_match_request_schema() {
        let params = Hyperparameters::default();
        assert_eq!(params.n_estimators, 100);
        assert_eq!(params.max_depth, None);
        assert_eq!(params.test_size, 0.2);
        assert_eq!(params.random_state, 42);
        params.validate().unwrap();
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        for params in [
            Hyperparameters {
                n_estimators: 0,
                ..Hyperparameters::default()
            },
            Hyperparameters {
                max_depth: Some(0),
                ..Hyperparameters::default()
            },
            Hyperparameters {
                test_size: 1.0,
                ..Hyperparameters::default()
            },
        ] {
            assert_eq!(params.validate().unwrap_err().kind(), ErrorKind::BadInput);
        }
    }

    #[test]
    fn train_writes_model_and_metrics() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(&StorageConfig::rooted_at(dir.path()));
        let dataset = write_dataset(dir.path());
        let result = train(&store, &dataset, "label", &small_params(), None).unwrap();
        assert!(result.model_path.ends_with("model_blobs.json"));
        assert!(result.metrics_path.ends_with("metrics_blobs.json"));
        assert_eq!(result.report.total_support, 15);
        assert!((0.0..=1.0).contains(&result.accuracy));
        let artifact = store.read_model("blobs").unwrap();
        assert_eq!(artifact.feature_names, vec!["a", "b"]);
        assert_eq!(artifact.capabilities.known_classes, vec!["left", "right"]);
    }

    #[test]
    fn cancelled_run_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(&StorageConfig::rooted_at(dir.path()));
        let dataset = write_dataset(dir.path());
        let flag = AtomicBool::new(true);
        let err = train(&store, &dataset, "label", &small_params(), Some(&flag)).unwrap_err();
        assert!(matches!(err, ServiceError::Cancelled));
        assert!(!store.model_path("blobs").exists());
        assert!(!store.metrics_path("blobs").exists());
    }

    #[test]
    fn missing_target_is_bad_input() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(&StorageConfig::rooted_at(dir.path()));
        let dataset = write_dataset(dir.path());
        let err = train(&store, &dataset, "nope", &small_params(), None).unwrap_err();
        assert_eq!(err.to_string(), "Target column not found in dataset.");
        assert_eq!(err.kind(), ErrorKind::BadInput);
    }
}
