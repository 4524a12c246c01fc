//! Developer utility to train a model from a stored dataset.

use std::path::PathBuf;

use tabml::config::StorageConfig;
use tabml::service::TabularService;
use tabml::training::Hyperparameters;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = tabml::logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    let config =
        StorageConfig::load_or_env(options.config.as_deref()).map_err(|err| err.to_string())?;
    config.ensure_dirs().map_err(|err| err.to_string())?;
    let service = TabularService::new(config);
    let result = service
        .train(&options.dataset, &options.target, &options.hyperparameters)
        .map_err(|err| err.to_string())?;
    let json = serde_json::to_string_pretty(&result).map_err(|err| err.to_string())?;
    println!("{json}");
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    dataset: String,
    target: String,
    hyperparameters: Hyperparameters,
    config: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut dataset: Option<String> = None;
    let mut target: Option<String> = None;
    let mut hyperparameters = Hyperparameters::default();
    let mut config: Option<PathBuf> = None;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--dataset" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--dataset requires a value".to_string())?;
                dataset = Some(value.clone());
            }
            "--target" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--target requires a value".to_string())?;
                target = Some(value.clone());
            }
            "--n-estimators" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--n-estimators requires a value".to_string())?;
                hyperparameters.n_estimators = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --n-estimators value: {value}"))?;
            }
            "--max-depth" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--max-depth requires a value".to_string())?;
                hyperparameters.max_depth = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --max-depth value: {value}"))?,
                );
            }
            "--test-size" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--test-size requires a value".to_string())?;
                hyperparameters.test_size = value
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid --test-size value: {value}"))?;
            }
            "--random-state" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--random-state requires a value".to_string())?;
                hyperparameters.random_state = value
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid --random-state value: {value}"))?;
            }
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                config = Some(PathBuf::from(value));
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let dataset = dataset.ok_or_else(help_text)?;
    let target = target.ok_or_else(help_text)?;
    Ok(CliOptions {
        dataset,
        target,
        hyperparameters,
        config,
    })
}

fn help_text() -> String {
    [
        "tabml-train",
        "",
        "Trains a random forest classifier and stores the model and its metrics.",
        "",
        "Usage:",
        "  tabml-train --dataset <file> --target <column> [options]",
        "",
        "Options:",
        "  --dataset <file>        Name under the datasets root, or an absolute path (required).",
        "  --target <column>       Target column name (required).",
        "  --n-estimators <n>      Number of trees (default: 100).",
        "  --max-depth <n>         Maximum tree depth (default: unbounded).",
        "  --test-size <f64>       Held-out fraction (default: 0.2).",
        "  --random-state <n>      Seed for the split and the forest (default: 42).",
        "  --config <file>         TOML storage config (default: env roots).",
    ]
    .join("\n")
}
