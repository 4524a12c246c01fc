//! Developer utility to copy a CSV file into the datasets root.

use std::fs::File;
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
    config.ensure_dirs().map_err(|err| err.to_string())?;
    let service = TabularService::new(config);

    let file_name = options
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("Invalid file path: {}", options.file.display()))?
        .to_string();
    let reader = File::open(&options.file)
        .map_err(|err| format!("Failed to open {}: {err}", options.file.display()))?;
    let stored = service
        .import_dataset(&file_name, reader)
        .map_err(|err| err.to_string())?;
    let json = serde_json::to_string_pretty(&serde_json::json!({
        "message": "File uploaded successfully",
        "file_path": stored,
    }))
    .map_err(|err| err.to_string())?;
    println!("{json}");
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    file: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut file: Option<PathBuf> = None;
    let mut config: Option<PathBuf> = None;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--file" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--file requires a value".to_string())?;
                file = Some(PathBuf::from(value));
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

    let file = file.ok_or_else(help_text)?;
    Ok(CliOptions { file, config })
}

fn help_text() -> String {
    [
        "tabml-dataset-import",
        "",
        "Copies a CSV file into the datasets root so it can be trained on.",
        "",
        "Usage:",
        "  tabml-dataset-import --file <path.csv> [--config <file>]",
    ]
    .join("\n")
}
