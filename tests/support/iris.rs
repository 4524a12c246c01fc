use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const COLUMNS: [&str; 5] = [
    "sepal_len",
    "sepal_width",
    "petal_len",
    "petal_width",
    "species",
];
pub const SPECIES: [&str; 3] = ["setosa", "versicolor", "virginica"];

const CENTERS: [[f32; 4]; 3] = [
    [5.0, 3.4, 1.5, 0.25],
    [5.9, 2.8, 4.3, 1.3],
    [6.6, 3.0, 5.5, 2.0],
];

/// Iris-shaped CSV text: `per_class` rows for each species, interleaved.
pub fn iris_csv(per_class: usize) -> String {
    let mut out = COLUMNS.join(",");
    out.push('\n');
    out.push_str("5.1,3.5,1.4,0.2,setosa\n");
    for i in 0..per_class {
        for (class_idx, center) in CENTERS.iter().enumerate() {
            let row: Vec<String> = center
                .iter()
                .enumerate()
                .map(|(col, value)| {
                    let wobble = ((i * 7 + col * 3 + class_idx) % 9) as f32 - 4.0;
                    format!("{:.2}", value + wobble * 0.05)
                })
                .collect();
            let _ = writeln!(out, "{},{}", row.join(","), SPECIES[class_idx]);
        }
    }
    out
}

/// Write `iris_csv(per_class)` to `<dir>/<file_name>`.
pub fn write_iris(dir: &Path, file_name: &str, per_class: usize) -> PathBuf {
    std::fs::create_dir_all(dir).expect("create dataset dir");
    let path = dir.join(file_name);
    std::fs::write(&path, iris_csv(per_class)).expect("write iris csv");
    path
}
