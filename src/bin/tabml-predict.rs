//! Developer utility to run predictions against a stored model.

use std::path::PathBuf;

use tabml::config::StorageConfig;
use tabml::dataset::loader::read_feature_matrix;
use tabml::inference::DEFAULT_TOP_N;
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

    let rows = match &options.input {
        Input::Features(features) => vec![features.clone()],
        Input::Batch(path) => read_feature_matrix(path).map_err(|err| err.to_string())?,
    };
    let model = options.model.as_str();
    let output = match options.mode {
        Mode::Single => {
            let [features] = rows.as_slice() else {
                return Err("--mode single takes exactly one feature vector".to_string());
            };
            let prediction = service
                .predict_single(model, features)
                .map_err(|err| err.to_string())?;
            serde_json::json!({ "prediction": prediction })
        }
        Mode::Batch => {
            let predictions = service
                .predict_batch(model, &rows)
                .map_err(|err| err.to_string())?;
            serde_json::json!({ "predictions": predictions })
        }
        Mode::Proba => {
            let result = service
                .predict_probabilities(model, &rows)
                .map_err(|err| err.to_string())?;
            serde_json::to_value(result).map_err(|err| err.to_string())?
        }
        Mode::TopN => {
            let result = service
                .predict_top_n(model, &rows, options.top)
                .map_err(|err| err.to_string())?;
            serde_json::json!({ "top_n_predictions": result })
        }
    };
    let json = serde_json::to_string_pretty(&output).map_err(|err| err.to_string())?;
    println!("{json}");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Single,
    Batch,
    Proba,
    TopN,
}

#[derive(Debug, Clone, PartialEq)]
enum Input {
    Features(Vec<f32>),
    Batch(PathBuf),
}

#[derive(Debug, Clone)]
struct CliOptions {
    model: String,
    input: Input,
    mode: Mode,
    top: usize,
    config: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut model: Option<String> = None;
    let mut input: Option<Input> = None;
    let mut mode: Option<Mode> = None;
    let mut top = DEFAULT_TOP_N;
    let mut config: Option<PathBuf> = None;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                model = Some(value.clone());
            }
            "--features" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--features requires a value".to_string())?;
                input = Some(Input::Features(parse_features(value)?));
            }
            "--batch" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--batch requires a value".to_string())?;
                input = Some(Input::Batch(PathBuf::from(value)));
            }
            "--mode" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--mode requires a value".to_string())?;
                mode = Some(match value.as_str() {
                    "single" => Mode::Single,
                    "batch" => Mode::Batch,
                    "proba" => Mode::Proba,
                    "top-n" => Mode::TopN,
                    other => return Err(format!("Invalid --mode value: {other}")),
                });
            }
            "--top" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--top requires a value".to_string())?;
                top = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --top value: {value}"))?;
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

    let model = model.ok_or_else(help_text)?;
    let input = input.ok_or_else(help_text)?;
    let mode = mode.unwrap_or(match input {
        Input::Features(_) => Mode::Single,
        Input::Batch(_) => Mode::Batch,
    });
    Ok(CliOptions {
        model,
        input,
        mode,
        top,
        config,
    })
}

fn parse_features(value: &str) -> Result<Vec<f32>, String> {
    value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|_| format!("Invalid feature value: {part}"))
        })
        .collect()
}

fn help_text() -> String {
    [
        "tabml-predict",
        "",
        "Runs predictions against a stored model and prints JSON.",
        "",
        "Usage:",
        "  tabml-predict --model <name> (--features a,b,c | --batch <file.csv>) [options]",
        "",
        "Options:",
        "  --model <name>          Model name: model_<base>.json or <base> (required).",
        "  --features <list>       One comma-separated feature vector.",
        "  --batch <file>          Headerless CSV, one feature vector per line.",
        "  --mode <mode>           single | batch | proba | top-n (default: single for",
        "                          --features, batch for --batch).",
        "  --top <n>               Classes per row for top-n (default: 3).",
        "  --config <file>         TOML storage config (default: env roots).",
    ]
    .join("\n")
}
