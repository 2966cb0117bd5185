//! Learning module: evolutionary search without gradients.
//!
//! - **Population**: bounded top-K store of scored brains
//! - **WorkerPool**: parallel fan-out and pairwise tree reduction
//! - **Trainer**: epochs of mutate, score, and merge

pub mod pool;
pub mod population;
pub mod trainer;

pub use pool::WorkerPool;
pub use population::{EvaluatedBrain, Population};
pub use trainer::{mutation_rate, StopReason, Trainer, TrainerConfig, TrainingReport};
