use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Node of a flattened decision tree. Children always sit after their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// `feature <= threshold` goes left, everything else right.
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    /// Class distribution of the training samples that reached this leaf.
    Leaf { proba: Vec<f32> },
}

/// CART classification tree stored in pre-order, root at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    /// Class distribution of the leaf reached by `features`.
    pub fn leaf_proba(&self, features: &[f32]) -> &[f32] {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { proba } => return proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Longest root-to-leaf path, counted in edges.
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        let mut max_depth = 0;
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Node::Split { left, right, .. } = node {
                let child_depth = depths[idx] + 1;
                depths[*left] = child_depth;
                depths[*right] = child_depth;
                max_depth = max_depth.max(child_depth);
            }
        }
        max_depth
    }

    /// Check structural invariants so traversal can never loop or index out of bounds.
    pub fn validate(&self, n_classes: usize, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {idx} splits on feature {feature} but model has {n_features}"
                        ));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx} has invalid child {child}"));
                        }
                    }
                }
                Node::Leaf { proba } => {
                    if proba.len() != n_classes {
                        return Err(format!(
                            "leaf {idx} has {} probabilities but model has {n_classes} classes",
                            proba.len()
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f32,
    impurity: f64,
}

/// Grows one tree on a (bootstrap) sample of row indices.
pub(super) struct TreeBuilder<'a> {
    pub x: &'a [Vec<f32>],
    pub y: &'a [usize],
    pub n_classes: usize,
    pub n_features: usize,
    pub max_depth: Option<usize>,
    pub max_features: usize,
}

impl TreeBuilder<'_> {
    pub fn build(&self, sample: Vec<usize>, rng: &mut StdRng) -> DecisionTree {
        let mut nodes: Vec<Node> = Vec::new();
        // (rows, depth, parent index, is_left)
        let mut stack: Vec<(Vec<usize>, usize, Option<(usize, bool)>)> = vec![(sample, 0, None)];

        while let Some((rows, depth, parent)) = stack.pop() {
            let idx = nodes.len();
            if let Some((parent_idx, is_left)) = parent {
                if let Node::Split { left, right, .. } = &mut nodes[parent_idx] {
                    if is_left {
                        *left = idx;
                    } else {
                        *right = idx;
                    }
                }
            }

            let counts = self.class_counts(&rows);
            let is_pure = counts.iter().filter(|&&count| count > 0).count() <= 1;
            let depth_reached = self.max_depth.is_some_and(|max| depth >= max);
            let split = if is_pure || depth_reached || rows.len() < 2 {
                None
            } else {
                self.best_split(&rows, &counts, rng)
            };

            let Some(split) = split else {
                nodes.push(Node::Leaf {
                    proba: proportions(&counts, rows.len()),
                });
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .into_iter()
                .partition(|&row| self.x[row][split.feature] <= split.threshold);
            nodes.push(Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left: 0,
                right: 0,
            });
            stack.push((right_rows, depth + 1, Some((idx, false))));
            stack.push((left_rows, depth + 1, Some((idx, true))));
        }

        DecisionTree { nodes }
    }

    fn class_counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &row in rows {
            counts[self.y[row]] += 1;
        }
        counts
    }

    /// Lowest weighted Gini split over up to `max_features` non-constant features.
    fn best_split(
        &self,
        rows: &[usize],
        parent_counts: &[usize],
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(rng);

        let total = rows.len();
        let mut best: Option<SplitCandidate> = None;
        let mut visited = 0usize;
        let mut values: Vec<(f32, usize)> = Vec::with_capacity(total);
        let mut left_counts = vec![0usize; self.n_classes];
        let mut right_counts = vec![0usize; self.n_classes];

        for feature in features {
            if visited >= self.max_features {
                break;
            }
            values.clear();
            values.extend(rows.iter().map(|&row| (self.x[row][feature], self.y[row])));
            values.sort_by(|a, b| a.0.total_cmp(&b.0));
            if values[0].0 == values[total - 1].0 {
                continue;
            }
            visited += 1;

            left_counts.iter_mut().for_each(|count| *count = 0);
            right_counts.copy_from_slice(parent_counts);
            for pos in 0..total - 1 {
                let (value, class) = values[pos];
                left_counts[class] += 1;
                right_counts[class] -= 1;
                let next = values[pos + 1].0;
                if value == next {
                    continue;
                }
                let n_left = pos + 1;
                let n_right = total - n_left;
                let impurity = (n_left as f64 * gini(&left_counts, n_left)
                    + n_right as f64 * gini(&right_counts, n_right))
                    / total as f64;
                if best.is_none_or(|current| impurity < current.impurity) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: midpoint(value, next),
                        impurity,
                    });
                }
            }
        }
        best
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&count| {
            let p = count as f64 / total;
            p * p
        })
        .sum::<f64>()
}

fn midpoint(low: f32, high: f32) -> f32 {
    let mid = low / 2.0 + high / 2.0;
    if mid >= high || !mid.is_finite() { low } else { mid }
}

fn proportions(counts: &[usize], total: usize) -> Vec<f32> {
    if total == 0 {
        return vec![0.0; counts.len()];
    }
    counts
        .iter()
        .map(|&count| count as f32 / total as f32)
        .collect()
}
