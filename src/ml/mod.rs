//! Machine learning building blocks: the random forest classifier and its evaluation metrics.

pub mod forest;
pub mod metrics;

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Distinct labels in class order.
///
/// Labels sort numerically when every one of them parses as a number, and as
/// strings otherwise, so `["10", "2", "1"]` orders as `1, 2, 10`.
pub fn sorted_classes<'a>(labels: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut classes: Vec<String> = labels
        .into_iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let numeric: Option<Vec<f64>> = classes
        .iter()
        .map(|label| label.parse::<f64>().ok().filter(|value| value.is_finite()))
        .collect();
    if let Some(values) = numeric {
        let mut keyed: Vec<(f64, String)> = values.into_iter().zip(classes).collect();
        // Stable, so numerically equal spellings keep their string order.
        keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        classes = keyed.into_iter().map(|(_, label)| label).collect();
    }
    classes
}

/// Lookup from label to its position in `classes`.
pub(crate) fn class_index(classes: &[String]) -> HashMap<&str, usize> {
    classes
        .iter()
        .enumerate()
        .map(|(idx, label)| (label.as_str(), idx))
        .collect()
}
