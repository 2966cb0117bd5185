//! Runtime module: the pieces around a training run.
//!
//! - Model store (versioned brain files on disk)
//! - Training monitor (per-epoch metrics and plateau detection)

pub mod monitor;
pub mod store;

pub use monitor::{TrainingMonitor, TrainingStatus, TrainingSummary};
pub use store::{FileModelStore, ModelStore};
