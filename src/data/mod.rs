//! Data module: labelled batches, batch sources, and dataset readers.

pub mod batch;
pub mod mnist;
pub mod synthetic;
pub mod training;

pub use batch::{CyclingBatches, FixedBatch, TrainingBatchSource};
pub use mnist::MnistDataset;
pub use training::{item_margin, item_rate, BatchScore, ScoreMetric, TrainingData, TrainingItem};
