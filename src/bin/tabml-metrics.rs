//! Developer utility to print the stored metrics for a dataset.

use std::path::PathBuf;

use tabml::config::StorageConfig;
use tabml::service::TabularService;

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
    let service = TabularService::new(config);
    let metrics = service
        .get_metrics(&options.dataset)
        .map_err(|err| err.to_string())?;
    let json = serde_json::to_string_pretty(&metrics).map_err(|err| err.to_string())?;
    println!("{json}");
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    dataset: String,
    config: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut dataset: Option<String> = None;
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
    Ok(CliOptions { dataset, config })
}

fn help_text() -> String {
    [
        "tabml-metrics",
        "",
        "Prints the metrics document stored for a dataset.",
        "",
        "Usage:",
        "  tabml-metrics --dataset <file_name> [--config <file>]",
    ]
    .join("\n")
}
