//! Tabular datasets: CSV loading, seeded splitting and import into the dataset root.

pub mod import;
pub mod loader;
pub mod split;
