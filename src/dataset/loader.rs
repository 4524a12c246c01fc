//! CSV dataset loader.
//!
//! A dataset is a headered CSV table. One column is the classification target and
//! every other column is a numeric feature.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::ServiceError;

#[derive(Debug, Error)]
pub enum DatasetLoadError {
    #[error("dataset not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Csv(#[from] csv::Error),
    #[error("No columns to parse from file")]
    NoColumns,
    #[error("dataset has no rows")]
    NoRows,
    #[error("column '{0}' not found")]
    MissingColumn(String),
    #[error("column '{column}' row {row}: could not convert '{value}' to float")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },
}

impl From<DatasetLoadError> for ServiceError {
    fn from(err: DatasetLoadError) -> Self {
        match err {
            DatasetLoadError::NotFound(path) => ServiceError::DatasetNotFound { path },
            DatasetLoadError::MissingColumn(column) => ServiceError::MissingTarget { column },
            other => ServiceError::DatasetParse(other.to_string()),
        }
    }
}

/// Raw table as read from disk, cells trimmed.
#[derive(Debug, Clone)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Table split into a numeric feature matrix and a label vector.
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    /// Feature column names in table order (target removed).
    pub feature_names: Vec<String>,
    /// Feature matrix, row-major.
    pub x: Vec<Vec<f32>>,
    /// Class label per row, aligned with `x`.
    pub y: Vec<String>,
}

impl LabeledDataset {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Separate the target column from the feature columns.
    pub fn into_labeled(self, target_column: &str) -> Result<LabeledDataset, DatasetLoadError> {
        let target_idx = self
            .column_index(target_column)
            .ok_or_else(|| DatasetLoadError::MissingColumn(target_column.to_string()))?;
        let feature_names: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != target_idx)
            .map(|(_, name)| name.clone())
            .collect();

        let mut x = Vec::with_capacity(self.rows.len());
        let mut y = Vec::with_capacity(self.rows.len());
        for (row_idx, mut row) in self.rows.into_iter().enumerate() {
            let label = row.remove(target_idx);
            let features = row
                .iter()
                .zip(&feature_names)
                .map(|(cell, column)| {
                    parse_feature(cell).ok_or_else(|| DatasetLoadError::NonNumeric {
                        column: column.clone(),
                        row: row_idx + 1,
                        value: cell.clone(),
                    })
                })
                .collect::<Result<Vec<f32>, _>>()?;
            x.push(features);
            y.push(label);
        }

        Ok(LabeledDataset {
            feature_names,
            x,
            y,
        })
    }
}

/// Read a headered CSV file into memory.
pub fn read_table(path: &Path) -> Result<Table, DatasetLoadError> {
    if !path.is_file() {
        return Err(DatasetLoadError::NotFound(path.to_path_buf()));
    }
    read_table_from(File::open(path)?)
}

pub fn read_table_from<R: Read>(reader: R) -> Result<Table, DatasetLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if columns.is_empty() || columns.iter().all(|column| column.is_empty()) {
        return Err(DatasetLoadError::NoColumns);
    }
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    if rows.is_empty() {
        return Err(DatasetLoadError::NoRows);
    }
    Ok(Table { columns, rows })
}

/// Load a dataset and split off its target column.
pub fn load_labeled(path: &Path, target_column: &str) -> Result<LabeledDataset, DatasetLoadError> {
    read_table(path)?.into_labeled(target_column)
}

/// Read a headerless numeric CSV into a feature matrix.
///
/// Rows may have different lengths; shape checks belong to the caller.
pub fn read_feature_matrix(path: &Path) -> Result<Vec<Vec<f32>>, DatasetLoadError> {
    if !path.is_file() {
        return Err(DatasetLoadError::NotFound(path.to_path_buf()));
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(File::open(path)?);
    let mut matrix = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        let row = record
            .iter()
            .enumerate()
            .map(|(col_idx, cell)| {
                parse_feature(cell).ok_or_else(|| DatasetLoadError::NonNumeric {
                    column: col_idx.to_string(),
                    row: row_idx + 1,
                    value: cell.to_string(),
                })
            })
            .collect::<Result<Vec<f32>, _>>()?;
        matrix.push(row);
    }
    Ok(matrix)
}

/// Finite `f32` or nothing; `NaN` and infinities are rejected like any other junk.
fn parse_feature(cell: &str) -> Option<f32> {
    cell.parse::<f32>().ok().filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::tempdir;

    const IRIS_HEAD: &str = "sepal_len,sepal_width,petal_len,petal_width,species
5.1,3.5,1.4,0.2,setosa
7.0,3.2,4.7,1.4,versicolor
6.3,3.3,6.0,2.5,virginica
";

    #[test]
    fn splits_target_from_features() {
        let table = read_table_from(IRIS_HEAD.as_bytes()).unwrap();
        let labeled = table.into_labeled("species").unwrap();
        assert_eq!(
            labeled.feature_names,
            vec!["sepal_len", "sepal_width", "petal_len", "petal_width"]
        );
        assert_eq!(labeled.x[1], vec![7.0, 3.2, 4.7, 1.4]);
        assert_eq!(labeled.y, vec!["setosa", "versicolor", "virginica"]);
    }

    #[test]
    fn target_may_sit_in_the_middle() {
        let table = read_table_from("a,label,b\n1,x,2\n3,y,4\n".as_bytes()).unwrap();
        let labeled = table.into_labeled("label").unwrap();
        assert_eq!(labeled.feature_names, vec!["a", "b"]);
        assert_eq!(labeled.x, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn missing_target_is_bad_input() {
        let table = read_table_from(IRIS_HEAD.as_bytes()).unwrap();
        let err: ServiceError = table.into_labeled("genus").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::BadInput);
        assert_eq!(err.to_string(), "Target column not found in dataset.");
    }

    #[test]
    fn ragged_rows_fail_with_reason() {
        let err = read_table_from("a,b,y\n1,2,x\n3,z\n".as_bytes()).unwrap_err();
        let err: ServiceError = err.into();
        assert_eq!(err.kind(), ErrorKind::BadInput);
        assert!(err.to_string().starts_with("Error loading dataset: "));
    }

    #[test]
    fn non_numeric_feature_names_column_and_row() {
        let table = read_table_from("a,y\n1,x\nfoo,y\n".as_bytes()).unwrap();
        let err = table.into_labeled("y").unwrap_err();
        assert_eq!(
            err.to_string(),
            "column 'a' row 2: could not convert 'foo' to float"
        );
    }

    #[test]
    fn non_finite_feature_is_rejected() {
        let table = read_table_from("a,y\n1,x\nNaN,y\n".as_bytes()).unwrap();
        assert!(matches!(
            table.into_labeled("y").unwrap_err(),
            DatasetLoadError::NonNumeric { row: 2, .. }
        ));
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let err = read_table_from("a,b,y\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DatasetLoadError::NoRows));
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let dir = tempdir().unwrap();
        let err: ServiceError = read_table(&dir.path().join("nope.csv")).unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn feature_matrix_keeps_ragged_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch.csv");
        std::fs::write(&path, "1,2,3\n4,5\n").unwrap();
        let matrix = read_feature_matrix(&path).unwrap();
        assert_eq!(matrix, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0]]);
    }
}
