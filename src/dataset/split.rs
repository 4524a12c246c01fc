//! Seeded train/test split.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::loader::LabeledDataset;

/// Row indices assigned to each side of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n_rows` with `seed` and hold out `ceil(test_size * n_rows)` rows.
///
/// Returns `Err` when either side would be empty.
pub fn train_test_indices(
    n_rows: usize,
    test_size: f64,
    seed: u64,
) -> Result<SplitIndices, String> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(format!("test_size={test_size} should be in the (0, 1) range"));
    }
    let n_test = (test_size * n_rows as f64).ceil() as usize;
    let n_train = n_rows.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(format!(
            "With n_samples={n_rows} and test_size={test_size}, the resulting train set \
             would have {n_train} rows and the test set {n_test}; both must be non-empty"
        ));
    }

    let mut order: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    let train = order.split_off(n_test);
    Ok(SplitIndices { train, test: order })
}

/// Materialize both halves of a labeled dataset.
pub fn train_test_split(
    dataset: &LabeledDataset,
    test_size: f64,
    seed: u64,
) -> Result<(LabeledDataset, LabeledDataset), String> {
    let indices = train_test_indices(dataset.len(), test_size, seed)?;
    Ok((
        subset(dataset, &indices.train),
        subset(dataset, &indices.test),
    ))
}

fn subset(dataset: &LabeledDataset, rows: &[usize]) -> LabeledDataset {
    LabeledDataset {
        feature_names: dataset.feature_names.clone(),
        x: rows.iter().map(|&idx| dataset.x[idx].clone()).collect(),
        y: rows.iter().map(|&idx| dataset.y[idx].clone()).collect(),
    }
}
