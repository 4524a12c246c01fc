//! Training pipeline behavior through the service facade.

mod support;

use std::sync::Arc;

use support::iris::{SPECIES, write_iris};
use tabml::config::StorageConfig;
use tabml::training::Hyperparameters;
use tabml::{ErrorKind, TabularService};
use tempfile::tempdir;

fn iris_service(root: &std::path::Path) -> TabularService {
    let config = StorageConfig::rooted_at(root);
    config.ensure_dirs().unwrap();
    write_iris(&config.datasets_dir, "iris.csv", 40);
    TabularService::new(config)
}

fn iris_params() -> Hyperparameters {
    Hyperparameters {
        n_estimators: 50,
        test_size: 0.25,
        random_state: 7,
        ..Hyperparameters::default()
    }
}

#[test]
fn iris_scenario_trains_and_predicts() {
    let dir = tempdir().unwrap();
    let service = iris_service(dir.path());
    let result = service.train("iris.csv", "species", &iris_params()).unwrap();

    assert!((0.0..=1.0).contains(&result.accuracy));
    // 121 rows, ceil(0.25 * 121) held out.
    assert_eq!(result.report.total_support, 31);
    let support_sum: u32 = result.report.per_class.iter().map(|row| row.support).sum();
    assert_eq!(support_sum, 31);

    let artifact = service.store().read_model("iris").unwrap();
    assert_eq!(artifact.capabilities.expected_feature_count, 4);
    assert_eq!(artifact.model.trees.len(), 50);

    let label = service
        .predict_single("model_iris.json", &[5.1, 3.5, 1.4, 0.2])
        .unwrap();
    assert!(SPECIES.contains(&label.as_str()));
}

#[test]
fn same_seed_gives_same_report() {
    let dir = tempdir().unwrap();
    let service = iris_service(dir.path());
    let first = service.train("iris.csv", "species", &iris_params()).unwrap();
    let second = service.train("iris.csv", "species", &iris_params()).unwrap();
    assert_eq!(first.accuracy, second.accuracy);
    assert_eq!(first.report, second.report);
}

#[test]
fn metrics_round_trip_after_training() {
    let dir = tempdir().unwrap();
    let service = iris_service(dir.path());
    let result = service.train("iris.csv", "species", &iris_params()).unwrap();
    let metrics = service.get_metrics("iris.csv").unwrap();
    assert_eq!(metrics.accuracy, result.accuracy);
    assert_eq!(metrics.report, result.report);

    let raw = std::fs::read_to_string(&result.metrics_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(json["accuracy"].is_number());
    assert!(json["report"]["per_class"].is_array());
    assert!(json["report"]["macro_avg"]["f1"].is_number());
}

#[test]
fn retraining_replaces_the_pair() {
    let dir = tempdir().unwrap();
    let service = iris_service(dir.path());
    service.train("iris.csv", "species", &iris_params()).unwrap();
    let params = Hyperparameters {
        n_estimators: 3,
        max_depth: Some(1),
        ..iris_params()
    };
    let result = service.train("iris.csv", "species", &params).unwrap();

    let artifact = service.store().read_model("iris").unwrap();
    assert_eq!(artifact.model.trees.len(), 3);
    assert_eq!(artifact.hyperparameters, params);
    assert_eq!(service.get_metrics("iris").unwrap().report, result.report);
    assert_eq!(service.list_models().unwrap(), vec!["iris"]);
}

#[test]
fn dataset_errors_map_to_taxonomy() {
    let dir = tempdir().unwrap();
    let service = iris_service(dir.path());

    let err = service.train("absent.csv", "species", &iris_params()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "Dataset not found.");

    let err = service.train("iris.csv", "colour", &iris_params()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadInput);

    std::fs::write(
        service.config().datasets_dir.join("broken.csv"),
        "a,b,label\n1,2,x\n3,y\n",
    )
    .unwrap();
    let err = service.train("broken.csv", "label", &iris_params()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadInput);
    assert!(err.to_string().starts_with("Error loading dataset: "));
    assert!(service.get_metrics("broken.csv").is_err());
}

#[test]
fn out_of_range_hyperparameters_are_rejected() {
    let dir = tempdir().unwrap();
    let service = iris_service(dir.path());
    let params = Hyperparameters {
        test_size: 0.0,
        ..iris_params()
    };
    let err = service.train("iris.csv", "species", &params).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadInput);
    assert!(service.list_models().unwrap().is_empty());
}

#[test]
fn imported_dataset_is_trainable() {
    let dir = tempdir().unwrap();
    let service = TabularService::new(StorageConfig::rooted_at(dir.path()));
    let csv = support::iris::iris_csv(10);
    let stored = service.import_dataset("flowers.csv", csv.as_bytes()).unwrap();
    assert!(stored.ends_with("datasets/flowers.csv"));

    let result = service
        .train("flowers.csv", "species", &Hyperparameters::default())
        .unwrap();
    assert!(result.model_path.ends_with("model_flowers.json"));
    assert_eq!(service.locate_model("flowers").unwrap(), result.model_path);
}

#[test]
fn blocked_metrics_write_keeps_previous_model() {
    let dir = tempdir().unwrap();
    let service = iris_service(dir.path());
    let first = service.train("iris.csv", "species", &iris_params()).unwrap();
    let model_before = std::fs::read(&first.model_path).unwrap();

    std::fs::remove_file(&first.metrics_path).unwrap();
    std::fs::create_dir_all(first.metrics_path.join("blocker")).unwrap();
    let params = Hyperparameters {
        n_estimators: 5,
        ..iris_params()
    };
    let err = service.train("iris.csv", "species", &params).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    assert_eq!(std::fs::read(&first.model_path).unwrap(), model_before);
    let models: Vec<String> = std::fs::read_dir(&service.config().models_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(models, vec!["model_iris.json"]);
}

#[test]
fn blocked_first_run_leaves_no_model() {
    let dir = tempdir().unwrap();
    let service = iris_service(dir.path());
    let metrics_path = service.store().metrics_path("iris");
    std::fs::create_dir_all(metrics_path.join("blocker")).unwrap();

    assert!(service.train("iris.csv", "species", &iris_params()).is_err());
    let err = service
        .predict_single("iris", &[5.1, 3.5, 1.4, 0.2])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn concurrent_retrains_store_a_matching_pair() {
    let dir = tempdir().unwrap();
    let service = Arc::new(iris_service(dir.path()));
    let handles: Vec<_> = (0..6u64)
        .map(|idx| {
            let service = Arc::clone(&service);
            std::thread::spawn(move || {
                let params = Hyperparameters {
                    n_estimators: 5 + idx as usize,
                    random_state: 100 + idx,
                    ..iris_params()
                };
                service.train("iris.csv", "species", &params).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stored = service.store().read_model("iris").unwrap();
    let metrics = service.get_metrics("iris.csv").unwrap();
    let rerun = service
        .train("iris.csv", "species", &stored.hyperparameters)
        .unwrap();
    assert_eq!(metrics.report, rerun.report);
    assert_eq!(metrics.accuracy, rerun.accuracy);

    let file_names = |dir: &std::path::Path| -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    };
    assert_eq!(file_names(&service.config().models_dir), vec!["model_iris.json"]);
    assert_eq!(file_names(&service.config().results_dir), vec!["metrics_iris.json"]);
}

#[test]
fn nested_dataset_names_resolve_under_datasets_root() {
    let dir = tempdir().unwrap();
    let service = iris_service(dir.path());
    write_iris(&service.config().datasets_dir.join("sub"), "garden.csv", 10);
    let result = service
        .train("sub/garden.csv", "species", &Hyperparameters::default())
        .unwrap();
    assert!(result.model_path.ends_with("model_garden.json"));
    assert!(service.get_metrics("garden.csv").is_ok());
}
