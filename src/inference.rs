//! Inference over stored model artifacts.
//!
//! Every call resolves the model through the store and loads it fresh, then checks
//! input shape against the artifact's capability descriptor before predicting.

use serde::Serialize;

use crate::artifact::ModelArtifact;
use crate::error::{ServiceError, ServiceResult};
use crate::store::ArtifactStore;

/// Number of ranked classes returned when the caller does not choose.
pub const DEFAULT_TOP_N: usize = 3;

/// Per-row class probabilities plus the class order they follow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityPrediction {
    pub probabilities: Vec<Vec<f32>>,
    pub classes: Vec<String>,
}

/// One ranked entry of a top-N prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedClass {
    pub class: String,
    pub probability: f32,
}

pub struct InferenceEngine<'a> {
    store: &'a ArtifactStore,
}

impl<'a> InferenceEngine<'a> {
    pub fn new(store: &'a ArtifactStore) -> Self {
        Self { store }
    }

    pub fn predict_single(&self, model_name: &str, features: &[f32]) -> ServiceResult<String> {
        let artifact = self.load(model_name, "single", 1)?;
        check_feature_count(&artifact, features)?;
        Ok(artifact.model.predict_label(features).to_string())
    }

    pub fn predict_batch(
        &self,
        model_name: &str,
        rows: &[Vec<f32>],
    ) -> ServiceResult<Vec<String>> {
        let artifact = self.load(model_name, "batch", rows.len())?;
        check_matrix(&artifact, rows)?;
        Ok(rows
            .iter()
            .map(|row| artifact.model.predict_label(row).to_string())
            .collect())
    }

    pub fn predict_probabilities(
        &self,
        model_name: &str,
        rows: &[Vec<f32>],
    ) -> ServiceResult<ProbabilityPrediction> {
        let artifact = self.load(model_name, "proba", rows.len())?;
        check_matrix(&artifact, rows)?;
        let classes = probability_classes(&artifact)?;
        Ok(ProbabilityPrediction {
            probabilities: rows
                .iter()
                .map(|row| artifact.model.predict_proba(row))
                .collect(),
            classes,
        })
    }

    /// The `n` most probable classes per row, highest first.
    ///
    /// Equal probabilities keep the model's class order.
    pub fn predict_top_n(
        &self,
        model_name: &str,
        rows: &[Vec<f32>],
        n: usize,
    ) -> ServiceResult<Vec<Vec<RankedClass>>> {
        let artifact = self.load(model_name, "top-n", rows.len())?;
        check_matrix(&artifact, rows)?;
        let classes = probability_classes(&artifact)?;
        Ok(rows
            .iter()
            .map(|row| rank(&classes, artifact.model.predict_proba(row), n))
            .collect())
    }

    fn load(&self, model_name: &str, mode: &str, rows: usize) -> ServiceResult<ModelArtifact> {
        tracing::debug!("Inference ({mode}) on '{model_name}' for {rows} row(s)");
        self.store.read_model(model_name)
    }
}

fn rank(classes: &[String], proba: Vec<f32>, n: usize) -> Vec<RankedClass> {
    let mut ranked: Vec<(usize, f32)> = proba.into_iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
        .into_iter()
        .take(n)
        .map(|(idx, probability)| RankedClass {
            class: classes[idx].clone(),
            probability,
        })
        .collect()
}

fn probability_classes(artifact: &ModelArtifact) -> ServiceResult<Vec<String>> {
    if !artifact.capabilities.supports_probabilities {
        return Err(ServiceError::ProbabilitiesUnsupported);
    }
    if artifact.capabilities.known_classes.is_empty() {
        return Err(ServiceError::ClassesUnavailable);
    }
    Ok(artifact.capabilities.known_classes.clone())
}

fn check_feature_count(artifact: &ModelArtifact, features: &[f32]) -> ServiceResult<()> {
    let expected = artifact.capabilities.expected_feature_count;
    if features.len() != expected {
        return Err(ServiceError::FeatureCountMismatch {
            expected,
            received: features.len(),
        });
    }
    Ok(())
}

/// Rejects empty and ragged matrices before comparing the width to the model.
fn check_matrix(artifact: &ModelArtifact, rows: &[Vec<f32>]) -> ServiceResult<()> {
    let Some(first) = rows.first() else {
        return Err(ServiceError::NotRectangular);
    };
    if rows.iter().any(|row| row.len() != first.len()) {
        return Err(ServiceError::NotRectangular);
    }
    check_feature_count(artifact, first)
}
