//! Evaluation metrics for classification models.

use serde::{Deserialize, Serialize};

use super::{class_index, sorted_classes};

#[derive(Debug, Clone)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&count| count as u64).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    /// Harmonic mean of precision and recall.
    pub f1: f32,
    /// Total number of true examples for the class.
    pub support: u32,
}

/// Compute per-class precision, recall and F1 from a confusion matrix.
///
/// Any ratio with a zero denominator is reported as `0.0`.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    let mut stats = Vec::with_capacity(k);
    for class_idx in 0..k {
        let tp = cm.get(class_idx, class_idx) as f32;
        let mut fp = 0f32;
        let mut fn_ = 0f32;
        let mut support = 0u32;
        for j in 0..k {
            let v = cm.get(class_idx, j);
            support = support.saturating_add(v);
            if j != class_idx {
                fn_ += v as f32;
            }
        }
        for i in 0..k {
            if i != class_idx {
                fp += cm.get(i, class_idx) as f32;
            }
        }
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        stats.push(PerClassStats {
            precision,
            recall,
            f1,
            support,
        });
    }
    stats
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f32 {
    let correct: u64 = (0..cm.n_classes)
        .map(|class_idx| cm.get(class_idx, class_idx) as u64)
        .sum();
    let total = cm.total();
    if total == 0 {
        0.0
    } else {
        (correct as f32) / (total as f32)
    }
}

/// Precision/recall/F1 row for one label of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerClassMetric {
    pub label: String,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub support: u32,
}

/// Averaged precision/recall/F1 across labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetric {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub support: u32,
}

/// Per-label and aggregate scores for one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub per_class: Vec<PerClassMetric>,
    pub accuracy: f32,
    pub macro_avg: AverageMetric,
    pub weighted_avg: AverageMetric,
    pub total_support: u32,
}

impl ClassificationReport {
    /// Score predictions against ground truth.
    ///
    /// Rows cover the union of labels seen in either slice in class order, so a class
    /// the model never predicts still shows up with zero precision.
    pub fn from_labels(truth: &[String], predicted: &[String]) -> Self {
        let labels = sorted_classes(truth.iter().chain(predicted));
        let lookup = class_index(&labels);
        let index = |label: &String| lookup.get(label.as_str()).copied().unwrap_or_default();

        let mut cm = ConfusionMatrix::new(labels.len());
        for (t, p) in truth.iter().zip(predicted) {
            cm.add(index(t), index(p));
        }
        let stats = precision_recall_by_class(&cm);
        let total_support: u32 = stats.iter().map(|row| row.support).sum();

        Self {
            macro_avg: macro_average(&stats, total_support),
            weighted_avg: weighted_average(&stats, total_support),
            accuracy: accuracy(&cm),
            per_class: labels
                .into_iter()
                .zip(stats)
                .map(|(label, row)| PerClassMetric {
                    label,
                    precision: row.precision,
                    recall: row.recall,
                    f1: row.f1,
                    support: row.support,
                })
                .collect(),
            total_support,
        }
    }

    pub fn class(&self, label: &str) -> Option<&PerClassMetric> {
        self.per_class.iter().find(|row| row.label == label)
    }
}

fn macro_average(stats: &[PerClassStats], total_support: u32) -> AverageMetric {
    let n = stats.len().max(1) as f32;
    AverageMetric {
        precision: stats.iter().map(|row| row.precision).sum::<f32>() / n,
        recall: stats.iter().map(|row| row.recall).sum::<f32>() / n,
        f1: stats.iter().map(|row| row.f1).sum::<f32>() / n,
        support: total_support,
    }
}

fn weighted_average(stats: &[PerClassStats], total_support: u32) -> AverageMetric {
    if total_support == 0 {
        return AverageMetric {
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
            support: 0,
        };
    }
    let total = total_support as f32;
    let weighted = |value: fn(&PerClassStats) -> f32| {
        stats
            .iter()
            .map(|row| value(row) * row.support as f32)
            .sum::<f32>()
            / total
    };
    AverageMetric {
        precision: weighted(|row| row.precision),
        recall: weighted(|row| row.recall),
        f1: weighted(|row| row.f1),
        support: total_support,
    }
}
