//! Persisted artifact formats: the trained model with its capability descriptor,
//! and the metrics document written next to it.

use serde::{Deserialize, Serialize};

use crate::ml::forest::RandomForestModel;
use crate::ml::metrics::ClassificationReport;
use crate::training::Hyperparameters;

/// Model artifact format version.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// What a stored model can do, recorded at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    pub supports_probabilities: bool,
    pub expected_feature_count: usize,
    pub known_classes: Vec<String>,
}

/// Trained model plus everything inference needs to use it safely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub base_name: String,
    pub target_column: String,
    /// Feature column names in the order the model expects them.
    pub feature_names: Vec<String>,
    pub capabilities: ModelCapabilities,
    pub hyperparameters: Hyperparameters,
    pub model: RandomForestModel,
}

impl ModelArtifact {
    pub fn new(
        base_name: impl Into<String>,
        target_column: impl Into<String>,
        feature_names: Vec<String>,
        hyperparameters: Hyperparameters,
        model: RandomForestModel,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            base_name: base_name.into(),
            target_column: target_column.into(),
            capabilities: ModelCapabilities {
                supports_probabilities: true,
                expected_feature_count: model.n_features,
                known_classes: model.classes.clone(),
            },
            feature_names,
            hyperparameters,
            model,
        }
    }

    /// Validate that the descriptor agrees with the model it describes.
    pub fn validate(&self) -> Result<(), String> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(format!(
                "Unsupported format_version {} (expected {ARTIFACT_FORMAT_VERSION})",
                self.format_version
            ));
        }
        if self.capabilities.expected_feature_count != self.model.n_features {
            return Err(format!(
                "expected_feature_count {} does not match model n_features {}",
                self.capabilities.expected_feature_count, self.model.n_features
            ));
        }
        if self.feature_names.len() != self.model.n_features {
            return Err("feature_names length mismatch".to_string());
        }
        if !self.capabilities.known_classes.is_empty()
            && self.capabilities.known_classes != self.model.classes
        {
            return Err("known_classes do not match model classes".to_string());
        }
        self.model.validate()
    }
}

/// Evaluation results persisted once per training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsDocument {
    pub accuracy: f32,
    pub report: ClassificationReport,
}
