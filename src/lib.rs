//! Library exports for the CLIs, benchmarks and tests.
/// Application home directory resolution.
pub mod app_dirs;
/// Persisted model and metrics formats.
pub mod artifact;
/// Storage roots configuration.
pub mod config;
/// CSV loading, splitting and import.
pub mod dataset;
/// Error taxonomy.
pub mod error;
/// Prediction over stored models.
pub mod inference;
/// Background training jobs.
pub mod jobs;
/// Tracing setup.
pub mod logging;
/// Random forest and evaluation metrics.
pub mod ml;
/// Boundary facade.
pub mod service;
/// Filesystem artifact store.
pub mod store;
/// Training pipeline.
pub mod training;

pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use service::TabularService;
