use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tabml::config::StorageConfig;
use tabml::ml::forest::{ForestOptions, TrainDataset, train_random_forest};
use tabml::service::TabularService;
use tabml::training::Hyperparameters;
use tempfile::tempdir;

const ROWS: usize = 600;
const FEATURES: usize = 8;

fn synthetic_rows() -> (Vec<Vec<f32>>, Vec<String>) {
    let mut x = Vec::with_capacity(ROWS);
    let mut labels = Vec::with_capacity(ROWS);
    for i in 0..ROWS {
        let class = i % 3;
        let row = (0..FEATURES)
            .map(|col| class as f32 * 2.0 + ((i * 31 + col * 17) % 13) as f32 * 0.1)
            .collect();
        x.push(row);
        labels.push(format!("c{class}"));
    }
    (x, labels)
}

fn dataset_csv() -> String {
    let (x, labels) = synthetic_rows();
    let mut out: Vec<String> = Vec::with_capacity(ROWS + 1);
    let mut header: Vec<String> = (0..FEATURES).map(|col| format!("f{col}")).collect();
    header.push("label".to_string());
    out.push(header.join(","));
    for (row, label) in x.iter().zip(&labels) {
        let mut cells: Vec<String> = row.iter().map(|value| value.to_string()).collect();
        cells.push(label.clone());
        out.push(cells.join(","));
    }
    out.join("\n")
}

fn bench_forest_fit(c: &mut Criterion) {
    let (x, labels) = synthetic_rows();
    let dataset = TrainDataset::from_labels(FEATURES, x, &labels);
    let options = ForestOptions {
        n_estimators: 20,
        ..ForestOptions::default()
    };
    c.bench_with_input(
        BenchmarkId::new("forest_fit", ROWS),
        &dataset,
        |b, dataset| {
            b.iter(|| train_random_forest(black_box(dataset), &options, None).expect("fit"));
        },
    );
}

fn bench_predict_top_n(c: &mut Criterion) {
    let dir = tempdir().expect("tempdir");
    let service = TabularService::new(StorageConfig::rooted_at(dir.path()));
    service
        .import_dataset("bench.csv", dataset_csv().as_bytes())
        .expect("import");
    let params = Hyperparameters {
        n_estimators: 50,
        ..Hyperparameters::default()
    };
    service.train("bench.csv", "label", &params).expect("train");
    let (rows, _) = synthetic_rows();
    c.bench_with_input(
        BenchmarkId::new("predict_top_n", rows.len()),
        &rows,
        |b, rows| {
            b.iter(|| {
                service
                    .predict_top_n("bench", black_box(rows), 3)
                    .expect("predict")
            });
        },
    );
}

criterion_group!(benches, bench_forest_fit, bench_predict_top_n);
criterion_main!(benches);
