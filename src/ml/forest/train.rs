use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use super::RandomForestModel;
use super::tree::TreeBuilder;
use crate::ml::{class_index, sorted_classes};

/// Forest hyperparameters.
#[derive(Debug, Clone)]
pub struct ForestOptions {
    /// Number of trees.
    pub n_estimators: usize,
    /// Maximum tree depth; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Seed for bootstrap sampling and feature selection.
    pub seed: u64,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Error)]
pub enum ForestTrainError {
    #[error("Empty dataset")]
    Empty,
    #[error("Mismatched X/Y lengths")]
    Mismatched,
    #[error("Row {row} has {len} features but expected {expected}")]
    Ragged {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("Label index {0} is out of range")]
    LabelOutOfRange(usize),
    #[error("n_estimators must be at least 1")]
    NoEstimators,
    #[error("Training cancelled after {completed} trees")]
    Cancelled { completed: usize },
}

/// In-memory training set with labels encoded as class indices.
#[derive(Debug, Clone)]
pub struct TrainDataset {
    /// Number of `f32` values in each feature vector.
    pub n_features: usize,
    /// Ordered list of class labels.
    pub classes: Vec<String>,
    /// Feature matrix, row-major.
    pub x: Vec<Vec<f32>>,
    /// Class indices aligned with `x`.
    pub y: Vec<usize>,
}

impl TrainDataset {
    /// Encode string labels against their distinct values in class order.
    pub fn from_labels(n_features: usize, x: Vec<Vec<f32>>, labels: &[String]) -> Self {
        let classes = sorted_classes(labels);
        let index = class_index(&classes);
        let y = labels
            .iter()
            .map(|label| index.get(label.as_str()).copied().unwrap_or_default())
            .collect();
        Self {
            n_features,
            classes,
            x,
            y,
        }
    }
}

/// Fit a random forest.
///
/// `cancel` is polled between trees.
pub fn train_random_forest(
    dataset: &TrainDataset,
    options: &ForestOptions,
    cancel: Option<&AtomicBool>,
) -> Result<RandomForestModel, ForestTrainError> {
    if dataset.x.len() != dataset.y.len() {
        return Err(ForestTrainError::Mismatched);
    }
    if dataset.x.is_empty() || dataset.classes.is_empty() {
        return Err(ForestTrainError::Empty);
    }
    if options.n_estimators == 0 {
        return Err(ForestTrainError::NoEstimators);
    }
    for (row, features) in dataset.x.iter().enumerate() {
        if features.len() != dataset.n_features {
            return Err(ForestTrainError::Ragged {
                row,
                len: features.len(),
                expected: dataset.n_features,
            });
        }
    }
    if let Some(&label) = dataset.y.iter().find(|&&label| label >= dataset.classes.len()) {
        return Err(ForestTrainError::LabelOutOfRange(label));
    }

    let n = dataset.x.len();
    let builder = TreeBuilder {
        x: &dataset.x,
        y: &dataset.y,
        n_classes: dataset.classes.len(),
        n_features: dataset.n_features,
        max_depth: options.max_depth,
        max_features: ((dataset.n_features as f64).sqrt().floor() as usize).max(1),
    };

    let mut seeds = StdRng::seed_from_u64(options.seed);
    let mut trees = Vec::with_capacity(options.n_estimators);
    for completed in 0..options.n_estimators {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(ForestTrainError::Cancelled { completed });
        }
        let mut rng = StdRng::seed_from_u64(seeds.random::<u64>());
        let bootstrap: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
        trees.push(builder.build(bootstrap, &mut rng));
    }

    Ok(RandomForestModel {
        classes: dataset.classes.clone(),
        n_features: dataset.n_features,
        trees,
    })
}
