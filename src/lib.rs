//! # evobrain
//!
//! Saturating int8 neural networks trained by population-based random
//! search instead of gradient descent.
//!
//! ## Components
//!
//! 1. **Quantized algebra**: i8 vectors and matrices; dot products
//!    accumulate wide and saturate into `[-128, 127]`
//! 2. **Layers**: dense, single convolution with 2×2 max pooling, and
//!    convolution ensembles
//! 3. **Brain**: an immutable pipeline of layers
//! 4. **Population**: bounded top-K store of scored brains
//! 5. **Trainer**: tours of mutate → score → merge on a worker pool
//!
//! ## Surroundings
//!
//! Training data and batch sources (synthetic and MNIST IDX), a versioned
//! on-disk model store, a per-epoch training monitor and TOML run settings.

pub mod core;
pub mod data;
pub mod error;
pub mod kernels;
pub mod layers;
pub mod learning;
pub mod network;
pub mod runtime;
pub mod settings;

pub use error::{BrainError, Result};
pub use network::Brain;

/// Model-wide constants.
pub mod config {
    /// Population capacity K.
    pub const POPULATION_CAPACITY: usize = 10;

    /// Mutated children bred from each member per tour.
    pub const MUTANTS_PER_MEMBER: usize = 15;

    /// Tours per epoch.
    pub const TOURS: usize = 4;

    /// Epoch limit.
    pub const MAX_EPOCHS: usize = 10;

    /// Training stops once the best rate exceeds this.
    pub const CONVERGENCE_RATE: f64 = 0.9999;

    /// Mutation rate schedule: `RATE_NUMERATOR / (tour + RATE_OFFSET + best_rate)`.
    pub const RATE_NUMERATOR: f64 = 3.0;
    pub const RATE_OFFSET: f64 = 6.0;

    /// Default run seed.
    pub const DEFAULT_SEED: u64 = 42;

    /// Items per training batch.
    pub const BATCH_SIZE: usize = 300;

    /// Max-pooling block side.
    pub const POOL_SIZE: usize = 2;

    /// Scale applied to a unit-length real activation before truncation to i8.
    pub const QUANT_SCALE: f64 = 127.0;

    /// Matrices with at least this many weights use the row-parallel kernel.
    pub const PARALLEL_MIN_WEIGHTS: usize = 1 << 16;

    /// Synthetic coordinates are drawn from `[0, SYNTHETIC_RANGE)`.
    pub const SYNTHETIC_RANGE: f64 = 10.0;
}
