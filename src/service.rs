//! Boundary facade used by transports and CLIs.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use tracing::warn;

use crate::artifact::MetricsDocument;
use crate::config::StorageConfig;
use crate::dataset::import::import_dataset;
use crate::error::ServiceResult;
use crate::inference::{InferenceEngine, ProbabilityPrediction, RankedClass};
use crate::store::{ArtifactStore, base_name};
use crate::training::{self, Hyperparameters, TrainingResult};

/// Training, inference and metrics retrieval over one set of storage roots.
#[derive(Debug)]
pub struct TabularService {
    config: StorageConfig,
    store: ArtifactStore,
}

impl TabularService {
    pub fn new(config: StorageConfig) -> Self {
        let store = ArtifactStore::new(&config);
        Self { config, store }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Resolve a dataset name against the datasets root.
    ///
    /// Relative names, including ones with subdirectories, live under the root;
    /// an absolute path replaces it.
    pub fn dataset_path(&self, dataset: &str) -> PathBuf {
        self.config.datasets_dir.join(Path::new(dataset))
    }

    pub fn train(
        &self,
        dataset: &str,
        target_column: &str,
        hyperparameters: &Hyperparameters,
    ) -> ServiceResult<TrainingResult> {
        self.train_with_cancel(dataset, target_column, hyperparameters, None)
    }

    pub(crate) fn train_with_cancel(
        &self,
        dataset: &str,
        target_column: &str,
        hyperparameters: &Hyperparameters,
        cancel: Option<&AtomicBool>,
    ) -> ServiceResult<TrainingResult> {
        logged("train", hyperparameters.validate())?;
        training::train(
            &self.store,
            &self.dataset_path(dataset),
            target_column,
            hyperparameters,
            cancel,
        )
    }

    pub fn predict_single(&self, model_name: &str, features: &[f32]) -> ServiceResult<String> {
        logged("predict", self.engine().predict_single(model_name, features))
    }

    pub fn predict_batch(&self, model_name: &str, rows: &[Vec<f32>]) -> ServiceResult<Vec<String>> {
        logged("predict_batch", self.engine().predict_batch(model_name, rows))
    }

    pub fn predict_probabilities(
        &self,
        model_name: &str,
        rows: &[Vec<f32>],
    ) -> ServiceResult<ProbabilityPrediction> {
        logged(
            "predict_proba",
            self.engine().predict_probabilities(model_name, rows),
        )
    }

    pub fn predict_top_n(
        &self,
        model_name: &str,
        rows: &[Vec<f32>],
        n: usize,
    ) -> ServiceResult<Vec<Vec<RankedClass>>> {
        logged(
            "predict_top_n",
            self.engine().predict_top_n(model_name, rows, n),
        )
    }

    /// Metrics document for a dataset file name (extension optional).
    pub fn get_metrics(&self, dataset_file_name: &str) -> ServiceResult<MetricsDocument> {
        logged(
            "metrics",
            self.store.read_metrics(&base_name(dataset_file_name)),
        )
    }

    pub fn import_dataset(&self, file_name: &str, reader: impl Read) -> ServiceResult<PathBuf> {
        logged(
            "import_dataset",
            import_dataset(&self.config.datasets_dir, file_name, reader),
        )
    }

    pub fn locate_model(&self, model_name: &str) -> ServiceResult<PathBuf> {
        logged("locate_model", self.store.locate_model(model_name))
    }

    pub fn list_models(&self) -> ServiceResult<Vec<String>> {
        logged("list_models", self.store.list_models())
    }

    fn engine(&self) -> InferenceEngine<'_> {
        InferenceEngine::new(&self.store)
    }
}

fn logged<T>(operation: &str, result: ServiceResult<T>) -> ServiceResult<T> {
    if let Err(err) = &result {
        warn!("{operation} failed ({:?}): {err}", err.kind());
    }
    result
}
