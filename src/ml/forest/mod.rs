//! Random forest classifier over dense `f32` features.
//!
//! - Bootstrap-sampled CART trees split on Gini impurity.
//! - `sqrt(n_features)` candidate features per node.
//! - Reproducible for a given seed, with JSON export/load.

mod train;
mod tree;

pub use train::{ForestOptions, ForestTrainError, TrainDataset, train_random_forest};
pub use tree::{DecisionTree, Node};

use serde::{Deserialize, Serialize};

/// Ensemble of decision trees voting with averaged class distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestModel {
    /// Ordered class labels; probability vectors follow this order.
    pub classes: Vec<String>,
    /// Number of `f32` values per feature vector.
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForestModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("Model must contain at least 1 class".to_string());
        }
        if self.trees.is_empty() {
            return Err("Model must contain at least 1 tree".to_string());
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.classes.len(), self.n_features)
                .map_err(|err| format!("tree {tree_idx}: {err}"))?;
        }
        Ok(())
    }

    /// Mean of the per-tree leaf distributions.
    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        let mut proba = vec![0.0f32; self.classes.len()];
        for tree in &self.trees {
            for (acc, &p) in proba.iter_mut().zip(tree.leaf_proba(features)) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len().max(1) as f32;
        for p in &mut proba {
            *p /= n_trees;
        }
        proba
    }

    /// Most probable class index; the lowest index wins ties.
    pub fn predict_class_index(&self, features: &[f32]) -> usize {
        argmax(&self.predict_proba(features))
    }

    pub fn predict_label(&self, features: &[f32]) -> &str {
        &self.classes[self.predict_class_index(features)]
    }
}

fn argmax(values: &[f32]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = f32::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = idx;
        }
    }
    best_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(proba: &[f32]) -> DecisionTree {
        DecisionTree {
            nodes: vec![Node::Leaf {
                proba: proba.to_vec(),
            }],
        }
    }

    #[test]
    fn probabilities_average_trees() {
        let model = RandomForestModel {
            classes: vec!["a".into(), "b".into()],
            n_features: 1,
            trees: vec![leaf(&[1.0, 0.0]), leaf(&[0.5, 0.5])],
        };
        assert_eq!(model.predict_proba(&[0.0]), vec![0.75, 0.25]);
        assert_eq!(model.predict_label(&[0.0]), "a");
    }

    #[test]
    fn ties_go_to_first_class() {
        let model = RandomForestModel {
            classes: vec!["a".into(), "b".into()],
            n_features: 1,
            trees: vec![leaf(&[0.0, 1.0]), leaf(&[1.0, 0.0])],
        };
        assert_eq!(model.predict_class_index(&[0.0]), 0);
    }

    #[test]
    fn validate_catches_class_count_mismatch() {
        let model = RandomForestModel {
            classes: vec!["a".into(), "b".into(), "c".into()],
            n_features: 1,
            trees: vec![leaf(&[0.5, 0.5])],
        };
        assert!(model.validate().unwrap_err().starts_with("tree 0:"));
    }
}
